//! Configuration for client instrumentation.
//!
//! [`InstrumentationConfig`] carries the per-integration knobs: tracer name,
//! capture flags, the truncation boundary for free-text fields, nested
//! resource traversal, and the attribute namespace prefix. Use
//! `InstrumentationConfig::default()` for standard behavior, or the builder
//! for customization.
//!
//! # Environment Configuration
//!
//! Environment variables take precedence over programmatic configuration
//! and are applied once per instrumentation call, when the engine resolves
//! the config it was given:
//!
//! - `OTEL_CLIENT_INSTRUMENT_TRACER_NAME`
//! - `OTEL_CLIENT_INSTRUMENT_CAPTURE_REQUEST_TEXT` ("true"/"false")
//! - `OTEL_CLIENT_INSTRUMENT_CAPTURE_RESPONSE_METADATA` ("true"/"false")
//! - `OTEL_CLIENT_INSTRUMENT_MAX_TEXT_LENGTH` (integer)
//! - `OTEL_CLIENT_INSTRUMENT_NESTED_RESOURCES` ("true"/"false")
//!
//! Invalid values are logged and the configured value is kept.
//!
//! # Example
//!
//! ```
//! use otel_client_instrument::InstrumentationConfig;
//!
//! let config = InstrumentationConfig::builder()
//!     .attribute_namespace("acme.db")
//!     .max_text_length(200)
//!     .build();
//! assert!(config.capture_request_text);
//! ```

use crate::constants::{defaults, env_vars};
use crate::logger::Logger;
use bon::Builder;
use std::env;

/// Module-specific logger
static LOGGER: Logger = Logger::const_new("config");

/// Per-instrumentation configuration. See the module docs for the
/// environment override behavior.
#[derive(Builder, Debug, Clone)]
pub struct InstrumentationConfig {
    /// Name of the tracer requested from the global provider.
    #[builder(into, default = defaults::TRACER_NAME.to_string())]
    pub tracer_name: String,

    /// Capture free-text request fields (e.g. statement text).
    ///
    /// Default: `true`
    #[builder(default = defaults::CAPTURE_REQUEST_TEXT)]
    pub capture_request_text: bool,

    /// Capture response metadata fields (e.g. returned identifiers).
    ///
    /// Default: `true`
    #[builder(default = defaults::CAPTURE_RESPONSE_METADATA)]
    pub capture_response_metadata: bool,

    /// Truncation boundary for captured free-text fields. Text longer than
    /// this keeps exactly this many characters plus the 3-character marker.
    ///
    /// Default: `1000`
    #[builder(default = defaults::MAX_TEXT_LENGTH)]
    pub max_text_length: usize,

    /// Whether the resource walker descends into nested resource groups.
    ///
    /// Default: `true`
    #[builder(default = defaults::INSTRUMENT_NESTED_RESOURCES)]
    pub instrument_nested_resources: bool,

    /// Namespace prefix applied to every attribute key this integration
    /// produces. Empty means unprefixed.
    #[builder(into, default)]
    pub attribute_namespace: String,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl InstrumentationConfig {
    /// Apply environment overrides on top of this configuration.
    ///
    /// Environment variables take precedence over programmatic values;
    /// unset variables leave the configured value alone, invalid ones are
    /// logged and ignored.
    pub fn resolve(mut self) -> Self {
        if let Ok(name) = env::var(env_vars::TRACER_NAME) {
            if !name.is_empty() {
                self.tracer_name = name;
            }
        }
        self.capture_request_text =
            resolve_bool(env_vars::CAPTURE_REQUEST_TEXT, self.capture_request_text);
        self.capture_response_metadata = resolve_bool(
            env_vars::CAPTURE_RESPONSE_METADATA,
            self.capture_response_metadata,
        );
        self.max_text_length = resolve_usize(env_vars::MAX_TEXT_LENGTH, self.max_text_length);
        self.instrument_nested_resources = resolve_bool(
            env_vars::NESTED_RESOURCES,
            self.instrument_nested_resources,
        );
        self
    }
}

fn resolve_bool(name: &str, configured: bool) -> bool {
    match env::var(name).map(|value| value.to_lowercase()).as_deref() {
        Ok("true") | Ok("1") => true,
        Ok("false") | Ok("0") => false,
        Ok(value) => {
            LOGGER.warn(format!(
                "InstrumentationConfig.resolve: invalid value for {name} in env: {value}, using config or default"
            ));
            configured
        }
        Err(_) => configured,
    }
}

fn resolve_usize(name: &str, configured: usize) -> usize {
    match env::var(name) {
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                LOGGER.warn(format!(
                    "InstrumentationConfig.resolve: invalid value for {name} in env: {value}, using config or default"
                ));
                configured
            }
        },
        Err(_) => configured,
    }
}
