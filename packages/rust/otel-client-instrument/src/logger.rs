//! Logging utilities for otel-client-instrument.
//!
//! This module provides a simple logging interface with level filtering and
//! prefixing for the engine's own diagnostics. Instrumentation must never
//! interfere with the wrapped call, so everything here writes to
//! stdout/stderr and stays out of the span pipeline.
//!
//! # Example
//! ```
//! use otel_client_instrument::logger::Logger;
//!
//! // Define a static logger for your module
//! static LOGGER: Logger = Logger::const_new("my_module");
//!
//! LOGGER.info("Starting module");
//! ```

use crate::constants::env_vars;
use std::env;
use std::sync::OnceLock;

// Global log level cache
static LOG_LEVEL: OnceLock<&'static str> = OnceLock::new();

/// Get the log level from environment variables
fn log_level() -> &'static str {
    LOG_LEVEL.get_or_init(|| {
        let level = env::var(env_vars::LOG_LEVEL)
            .or_else(|_| env::var("LOG_LEVEL"))
            .unwrap_or_else(|_| "info".to_string())
            .to_lowercase();

        match level.as_str() {
            "none" | "error" | "warn" | "info" | "debug" => Box::leak(level.into_boxed_str()),
            _ => "info",
        }
    })
}

/// Logger with level filtering and consistent prefixing
#[derive(Clone)]
pub struct Logger {
    prefix: &'static str,
}

impl Logger {
    /// Create a new logger with the given prefix, usable in const contexts
    pub const fn const_new(prefix: &'static str) -> Self {
        Self { prefix }
    }

    fn should_log(&self, level: &str) -> bool {
        match log_level() {
            "none" => false,
            "error" => level == "error",
            "warn" => matches!(level, "error" | "warn"),
            "info" => matches!(level, "error" | "warn" | "info"),
            "debug" => matches!(level, "error" | "warn" | "info" | "debug"),
            _ => matches!(level, "error" | "warn" | "info"),
        }
    }

    fn format_message(&self, message: &str) -> String {
        format!("[{}] {}", self.prefix, message)
    }

    /// Log a debug message
    pub fn debug(&self, message: impl AsRef<str>) {
        if self.should_log("debug") {
            println!("{}", self.format_message(message.as_ref()));
        }
    }

    /// Log an info message
    pub fn info(&self, message: impl AsRef<str>) {
        if self.should_log("info") {
            println!("{}", self.format_message(message.as_ref()));
        }
    }

    /// Log a warning message
    pub fn warn(&self, message: impl AsRef<str>) {
        if self.should_log("warn") {
            eprintln!("{}", self.format_message(message.as_ref()));
        }
    }

    /// Log an error message
    pub fn error(&self, message: impl AsRef<str>) {
        if self.should_log("error") {
            eprintln!("{}", self.format_message(message.as_ref()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        let logger = Logger::const_new("test");

        assert!(logger.should_log("error"));
        assert!(logger.should_log("warn"));
        assert!(logger.should_log("info"));
        assert!(!logger.should_log("invalid"));
    }

    #[test]
    fn test_format_message() {
        let logger = Logger::const_new("test");

        assert_eq!(logger.format_message("hello"), "[test] hello");
    }
}
