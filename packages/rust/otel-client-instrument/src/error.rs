//! Failure values and error normalization.
//!
//! SDKs are not consistent about what they fail with: some surface
//! structured error types, others reject with bare strings or arbitrary
//! payloads. [`OpFailure`] represents both, and [`normalize`] reduces any
//! failure to a canonical (message, type, stacktrace?) triple suitable for
//! recording as a span exception event. Normalization is total: it never
//! fails, whatever the input looks like.

use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::attribute::{
    EXCEPTION_MESSAGE, EXCEPTION_STACKTRACE, EXCEPTION_TYPE,
};
use serde_json::Value;
use std::error::Error as StdError;
use std::sync::Arc;

/// The failure value of a client operation.
///
/// Cloning is cheap and identity-preserving: the structured variant shares
/// the original error through an `Arc`, so a failure observed by the caller
/// is the same object the operation produced.
#[derive(Clone)]
pub enum OpFailure {
    /// A structured error.
    Error(Arc<dyn StdError + Send + Sync>),
    /// A bare value used as a failure (e.g. a rejection with a string).
    Value(Value),
}

impl OpFailure {
    /// Wrap a structured error.
    pub fn from_error(error: impl StdError + Send + Sync + 'static) -> Self {
        OpFailure::Error(Arc::new(error))
    }

    /// Wrap a bare failure value.
    pub fn from_value(value: impl Into<Value>) -> Self {
        OpFailure::Value(value.into())
    }

    /// Whether two failures are the same underlying error object (for the
    /// structured variant) or equal values (for the bare variant).
    pub fn same_failure(&self, other: &Self) -> bool {
        match (self, other) {
            (OpFailure::Error(a), OpFailure::Error(b)) => Arc::ptr_eq(a, b),
            (OpFailure::Value(a), OpFailure::Value(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for OpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpFailure::Error(error) => error.fmt(f),
            OpFailure::Value(Value::String(message)) => f.write_str(message),
            OpFailure::Value(value) => value.fmt(f),
        }
    }
}

impl std::fmt::Debug for OpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpFailure::Error(error) => f.debug_tuple("Error").field(error).finish(),
            OpFailure::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl StdError for OpFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            OpFailure::Error(error) => Some(error.as_ref() as &(dyn StdError + 'static)),
            OpFailure::Value(_) => None,
        }
    }
}

/// Canonical form of a failure, ready for exception recording.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedError {
    /// Human-readable message.
    pub message: String,
    /// Error type name, or the JSON type for bare failure values.
    pub error_type: String,
    /// The error's cause chain, when one exists.
    pub stacktrace: Option<String>,
}

/// Reduce any failure to its canonical triple. Total: never fails.
pub fn normalize(failure: &OpFailure) -> NormalizedError {
    match failure {
        OpFailure::Error(error) => NormalizedError {
            message: error.to_string(),
            error_type: debug_type_name(error.as_ref()),
            stacktrace: source_chain(error.as_ref()),
        },
        OpFailure::Value(value) => NormalizedError {
            message: match value {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            },
            error_type: json_type_name(value).to_string(),
            stacktrace: None,
        },
    }
}

/// Attributes for an `exception` span event.
pub(crate) fn exception_attributes(normalized: &NormalizedError) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(EXCEPTION_TYPE, normalized.error_type.clone()),
        KeyValue::new(EXCEPTION_MESSAGE, normalized.message.clone()),
    ];
    if let Some(stacktrace) = &normalized.stacktrace {
        attributes.push(KeyValue::new(EXCEPTION_STACKTRACE, stacktrace.clone()));
    }
    attributes
}

// An error's Debug form conventionally leads with its type or variant name.
fn debug_type_name(error: &(dyn StdError + 'static)) -> String {
    let debug = format!("{error:?}");
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        "Error".to_string()
    } else {
        name
    }
}

// The cause chain is the closest analogue of a stack trace available here.
fn source_chain(error: &(dyn StdError + 'static)) -> Option<String> {
    let mut frames = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        frames.push(format!("caused by: {cause}"));
        current = cause.source();
    }
    if frames.is_empty() {
        None
    } else {
        Some(frames.join("\n"))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("boom")]
        Boom,
        #[error("request failed")]
        Request(#[source] std::io::Error),
    }

    #[test]
    fn test_normalize_structured_error() {
        let failure = OpFailure::from_error(TestError::Boom);
        let normalized = normalize(&failure);

        assert_eq!(normalized.message, "boom");
        assert_eq!(normalized.error_type, "Boom");
        assert_eq!(normalized.stacktrace, None);
    }

    #[test]
    fn test_normalize_keeps_cause_chain() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let failure = OpFailure::from_error(TestError::Request(cause));
        let normalized = normalize(&failure);

        assert_eq!(normalized.message, "request failed");
        let stacktrace = normalized.stacktrace.unwrap();
        assert!(stacktrace.contains("caused by: reset by peer"));
    }

    #[test]
    fn test_normalize_string_value() {
        let normalized = normalize(&OpFailure::from_value("not today"));

        assert_eq!(normalized.message, "not today");
        assert_eq!(normalized.error_type, "string");
        assert_eq!(normalized.stacktrace, None);
    }

    #[test]
    fn test_normalize_arbitrary_value() {
        let normalized = normalize(&OpFailure::from_value(json!({"code": 42})));

        assert_eq!(normalized.message, r#"{"code":42}"#);
        assert_eq!(normalized.error_type, "object");
    }

    #[test]
    fn test_same_failure_is_identity_for_errors() {
        let failure = OpFailure::from_error(TestError::Boom);
        let alias = failure.clone();
        let other = OpFailure::from_error(TestError::Boom);

        assert!(failure.same_failure(&alias));
        assert!(!failure.same_failure(&other));
        assert!(OpFailure::from_value("x").same_failure(&OpFailure::from_value("x")));
    }

    #[test]
    fn test_exception_attributes_include_stacktrace_when_present() {
        let normalized = NormalizedError {
            message: "m".to_string(),
            error_type: "T".to_string(),
            stacktrace: Some("caused by: inner".to_string()),
        };

        let attributes = exception_attributes(&normalized);
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[0].key.as_str(), "exception.type");
        assert_eq!(attributes[1].key.as_str(), "exception.message");
        assert_eq!(attributes[2].key.as_str(), "exception.stacktrace");
    }
}
