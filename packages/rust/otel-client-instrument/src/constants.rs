//! Constants for the otel-client-instrument crate.
//!
//! This file centralizes all constants to ensure consistency across the codebase
//! and provide a single source of truth for configuration parameters.

/// Environment variable names for configuration.
pub mod env_vars {
    /// Name of the tracer requested from the global provider.
    pub const TRACER_NAME: &str = "OTEL_CLIENT_INSTRUMENT_TRACER_NAME";

    /// Whether free-text request fields (e.g. statement text) are captured.
    pub const CAPTURE_REQUEST_TEXT: &str = "OTEL_CLIENT_INSTRUMENT_CAPTURE_REQUEST_TEXT";

    /// Whether response metadata fields are captured.
    pub const CAPTURE_RESPONSE_METADATA: &str = "OTEL_CLIENT_INSTRUMENT_CAPTURE_RESPONSE_METADATA";

    /// Truncation boundary for captured free-text fields.
    pub const MAX_TEXT_LENGTH: &str = "OTEL_CLIENT_INSTRUMENT_MAX_TEXT_LENGTH";

    /// Whether the resource walker descends into nested resource groups.
    pub const NESTED_RESOURCES: &str = "OTEL_CLIENT_INSTRUMENT_NESTED_RESOURCES";

    /// Log level for the crate's internal diagnostics.
    pub const LOG_LEVEL: &str = "OTEL_CLIENT_INSTRUMENT_LOG_LEVEL";
}

/// Default values for configuration parameters.
pub mod defaults {
    /// Default tracer name if not provided.
    pub const TRACER_NAME: &str = "otel-client-instrument";

    /// Capture free-text request fields by default.
    pub const CAPTURE_REQUEST_TEXT: bool = true;

    /// Capture response metadata by default.
    pub const CAPTURE_RESPONSE_METADATA: bool = true;

    /// Default truncation boundary for captured free-text fields.
    pub const MAX_TEXT_LENGTH: usize = 1000;

    /// Descend into nested resource groups by default.
    pub const INSTRUMENT_NESTED_RESOURCES: bool = true;
}

/// Span attribute keys produced by the engine itself. Keys are prefixed with
/// the configured attribute namespace before being set on a span.
pub mod attributes {
    /// Qualified name of the wrapped operation, e.g. "portal.billing.list".
    pub const OPERATION: &str = "operation";
}

/// Marker appended to truncated text captures.
pub const TRUNCATION_MARKER: &str = "...";
