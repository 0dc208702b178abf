//! Attribute extraction for wrapped client operations.
//!
//! This module turns untyped request arguments and response payloads into
//! span attributes, driven by per-operation rule sets. Extraction is
//! deliberately defensive: every lookup and transform is a total function.
//! A missing field, an unexpected shape, or a type mismatch simply omits
//! the attribute; nothing in this module can fail the user's call.
//!
//! # Rules
//!
//! An [`AttributeRule`] names a span attribute key and an ordered list of
//! [`FieldSource`] candidates. Candidates are tried in declared order and
//! the first one present wins. This covers the two polymorphic shapes the
//! engine has to deal with:
//!
//! - request arguments that are either a plain scalar or an object carrying
//!   the interesting field under one of several alternate names, and
//! - response identifiers that appear either at the top level or nested
//!   under an envelope field such as `data`.
//!
//! A rule may apply a [`Transform`] (text truncation, array join, array
//! count) and is gated by a [`CaptureGate`] so whole classes of capture
//! (request text, response metadata) can be switched off in configuration.
//!
//! # Operation descriptors
//!
//! An [`OperationDescriptor`] is the static metadata for one wrapped
//! method: the method's property name, its qualified name, the span name
//! and kind, and its [`AttributeRuleSet`]. Descriptors are immutable once
//! built.

use crate::client::CallArg;
use crate::config::InstrumentationConfig;
use crate::constants::TRUNCATION_MARKER;
use bon::Builder;
use opentelemetry::trace::SpanKind;
use opentelemetry::{KeyValue, Value};
use serde_json::Value as JsonValue;

/// Where a rule reads its value from. Request-side sources resolve against
/// the call's positional arguments, response-side sources against the
/// operation's result payload.
#[derive(Debug, Clone)]
pub enum FieldSource {
    /// A positional argument, taken whole.
    Arg(usize),
    /// A dotted path inside a positional argument.
    ArgPath { index: usize, path: Vec<String> },
    /// The whole response payload.
    Response,
    /// A dotted path inside the response payload.
    ResponsePath { path: Vec<String> },
}

impl FieldSource {
    pub fn arg(index: usize) -> Self {
        FieldSource::Arg(index)
    }

    /// Dotted path inside argument `index`, e.g. `"options.table"`.
    pub fn arg_path(index: usize, path: &str) -> Self {
        FieldSource::ArgPath {
            index,
            path: split_path(path),
        }
    }

    pub fn response() -> Self {
        FieldSource::Response
    }

    /// Dotted path inside the response, e.g. `"data.id"`.
    pub fn response_path(path: &str) -> Self {
        FieldSource::ResponsePath {
            path: split_path(path),
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Optional value transform applied after lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Transform {
    /// Capture scalars as-is.
    #[default]
    None,
    /// Truncate text to the configured maximum length, appending the
    /// 3-character marker when anything was cut.
    Truncate,
    /// Join an array into a single delimited string.
    Join(String),
    /// Capture an array's length instead of its contents.
    Count,
}

/// Which configuration flag gates a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureGate {
    /// Always extracted.
    #[default]
    Always,
    /// Extracted only while request-text capture is enabled.
    RequestText,
    /// Extracted only while response-metadata capture is enabled.
    ResponseMetadata,
}

/// One extraction rule: attribute key, candidate sources, transform, gate.
#[derive(Builder, Debug, Clone)]
pub struct AttributeRule {
    /// Span attribute key, prefixed with the configured namespace.
    #[builder(into)]
    pub key: String,
    /// Candidate lookups, tried in order; the first present wins.
    pub sources: Vec<FieldSource>,
    #[builder(default)]
    pub transform: Transform,
    #[builder(default)]
    pub gate: CaptureGate,
}

/// The rules evaluated before and after one operation.
#[derive(Builder, Debug, Clone, Default)]
pub struct AttributeRuleSet {
    /// Evaluated against the call arguments before the operation runs.
    #[builder(default)]
    pub request: Vec<AttributeRule>,
    /// Evaluated against the response payload after a successful operation.
    #[builder(default)]
    pub response: Vec<AttributeRule>,
}

/// Static metadata for one wrapped method.
#[derive(Builder, Debug, Clone)]
pub struct OperationDescriptor {
    /// Property name of the method on its client object.
    #[builder(into)]
    pub method: String,
    /// Qualified operation name, e.g. `"portal.billing.list"`.
    #[builder(into)]
    pub qualified_name: String,
    /// Default span name for this operation.
    #[builder(into)]
    pub span_name: String,
    /// Span kind; client calls unless stated otherwise.
    #[builder(default = SpanKind::Client)]
    pub kind: SpanKind,
    #[builder(default)]
    pub rules: AttributeRuleSet,
}

/// Evaluate the request-side rules against the call arguments.
pub fn extract_pre(
    descriptor: &OperationDescriptor,
    config: &InstrumentationConfig,
    args: &[CallArg],
) -> Vec<KeyValue> {
    collect(&descriptor.rules.request, config, |source| {
        resolve_request(source, args)
    })
}

/// Evaluate the response-side rules against a successful result payload.
pub fn extract_post(
    descriptor: &OperationDescriptor,
    config: &InstrumentationConfig,
    response: &JsonValue,
) -> Vec<KeyValue> {
    collect(&descriptor.rules.response, config, |source| {
        resolve_response(source, response)
    })
}

/// Prefix an attribute key with the integration namespace.
pub(crate) fn qualified_key(namespace: &str, key: &str) -> String {
    if namespace.is_empty() {
        key.to_string()
    } else {
        format!("{namespace}.{key}")
    }
}

fn collect<'a>(
    rules: &[AttributeRule],
    config: &InstrumentationConfig,
    resolve: impl Fn(&FieldSource) -> Option<&'a JsonValue>,
) -> Vec<KeyValue> {
    let mut attributes = Vec::new();
    for rule in rules {
        if !gate_enabled(rule.gate, config) {
            continue;
        }
        let Some(found) = rule.sources.iter().find_map(&resolve) else {
            continue;
        };
        if let Some(value) = apply_transform(found, &rule.transform, config.max_text_length) {
            attributes.push(KeyValue::new(
                qualified_key(&config.attribute_namespace, &rule.key),
                value,
            ));
        }
    }
    attributes
}

fn gate_enabled(gate: CaptureGate, config: &InstrumentationConfig) -> bool {
    match gate {
        CaptureGate::Always => true,
        CaptureGate::RequestText => config.capture_request_text,
        CaptureGate::ResponseMetadata => config.capture_response_metadata,
    }
}

fn resolve_request<'a>(source: &FieldSource, args: &'a [CallArg]) -> Option<&'a JsonValue> {
    match source {
        FieldSource::Arg(index) => arg_value(args, *index),
        FieldSource::ArgPath { index, path } => {
            arg_value(args, *index).and_then(|value| lookup_path(value, path))
        }
        _ => None,
    }
}

fn resolve_response<'a>(source: &FieldSource, response: &'a JsonValue) -> Option<&'a JsonValue> {
    match source {
        FieldSource::Response => Some(response),
        FieldSource::ResponsePath { path } => lookup_path(response, path),
        _ => None,
    }
}

fn arg_value(args: &[CallArg], index: usize) -> Option<&JsonValue> {
    args.get(index).and_then(CallArg::as_value)
}

fn lookup_path<'a>(root: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    let mut current = root;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn apply_transform(
    value: &JsonValue,
    transform: &Transform,
    max_text_length: usize,
) -> Option<Value> {
    match transform {
        Transform::None => scalar_value(value),
        Transform::Truncate => value
            .as_str()
            .map(|text| truncate_text(text, max_text_length).into()),
        Transform::Join(delimiter) => value.as_array().map(|items| {
            items
                .iter()
                .map(|item| match item {
                    JsonValue::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(delimiter)
                .into()
        }),
        Transform::Count => value.as_array().map(|items| Value::I64(items.len() as i64)),
    }
}

fn scalar_value(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::String(text) => Some(text.clone().into()),
        JsonValue::Bool(flag) => Some(Value::Bool(*flag)),
        JsonValue::Number(number) => number
            .as_i64()
            .map(Value::I64)
            .or_else(|| number.as_f64().map(Value::F64)),
        // Arrays need an explicit transform; objects are never captured whole.
        _ => None,
    }
}

/// Keep the first `max_length` characters and mark the cut. Character
/// counts, not byte offsets, so multi-byte text never splits mid-character.
pub(crate) fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max_length).collect();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query_descriptor() -> OperationDescriptor {
        OperationDescriptor::builder()
            .method("query")
            .qualified_name("db.query")
            .span_name("db.query")
            .rules(
                AttributeRuleSet::builder()
                    .request(vec![
                        AttributeRule::builder()
                            .key("query.text")
                            .sources(vec![
                                FieldSource::arg_path(0, "query"),
                                FieldSource::arg_path(0, "sql"),
                                FieldSource::arg(0),
                            ])
                            .transform(Transform::Truncate)
                            .gate(CaptureGate::RequestText)
                            .build(),
                        AttributeRule::builder()
                            .key("query.parameter_count")
                            .sources(vec![FieldSource::arg_path(0, "params")])
                            .transform(Transform::Count)
                            .build(),
                    ])
                    .response(vec![AttributeRule::builder()
                        .key("response.id")
                        .sources(vec![
                            FieldSource::response_path("id"),
                            FieldSource::response_path("data.id"),
                        ])
                        .gate(CaptureGate::ResponseMetadata)
                        .build()])
                    .build(),
            )
            .build()
    }

    fn find<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a Value> {
        attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    #[test]
    fn test_object_shaped_query_argument() {
        let descriptor = query_descriptor();
        let config = InstrumentationConfig::default();
        let args = [CallArg::value(json!({
            "query": "SELECT * FROM users",
            "params": [1, 2, 3],
        }))];

        let attributes = extract_pre(&descriptor, &config, &args);

        assert_eq!(
            find(&attributes, "query.text"),
            Some(&Value::from("SELECT * FROM users"))
        );
        assert_eq!(
            find(&attributes, "query.parameter_count"),
            Some(&Value::I64(3))
        );
    }

    #[test]
    fn test_plain_string_query_argument() {
        let descriptor = query_descriptor();
        let config = InstrumentationConfig::default();
        let args = [CallArg::value(json!("SELECT 1"))];

        let attributes = extract_pre(&descriptor, &config, &args);

        assert_eq!(
            find(&attributes, "query.text"),
            Some(&Value::from("SELECT 1"))
        );
        assert!(find(&attributes, "query.parameter_count").is_none());
    }

    #[test]
    fn test_candidate_priority_order() {
        let descriptor = query_descriptor();
        let config = InstrumentationConfig::default();
        // Both alternate field names present: the first candidate wins.
        let args = [CallArg::value(json!({"query": "a", "sql": "b"}))];

        let attributes = extract_pre(&descriptor, &config, &args);
        assert_eq!(find(&attributes, "query.text"), Some(&Value::from("a")));
    }

    #[test]
    fn test_envelope_wrapped_response_id() {
        let descriptor = query_descriptor();
        let config = InstrumentationConfig::default();

        let direct = extract_post(&descriptor, &config, &json!({"id": "row_1"}));
        assert_eq!(find(&direct, "response.id"), Some(&Value::from("row_1")));

        let wrapped = extract_post(&descriptor, &config, &json!({"data": {"id": "row_2"}}));
        assert_eq!(find(&wrapped, "response.id"), Some(&Value::from("row_2")));

        let absent = extract_post(&descriptor, &config, &json!({"rows": []}));
        assert!(find(&absent, "response.id").is_none());
    }

    #[test]
    fn test_truncation_law() {
        let config = InstrumentationConfig::builder().max_text_length(50).build();
        let descriptor = query_descriptor();
        let long_text: String = "x".repeat(1200);
        let args = [CallArg::value(json!(long_text))];

        let attributes = extract_pre(&descriptor, &config, &args);
        let captured = match find(&attributes, "query.text").unwrap() {
            Value::String(text) => text.as_str().to_string(),
            other => panic!("unexpected attribute value: {other:?}"),
        };

        assert_eq!(captured.chars().count(), 53);
        assert!(captured.ends_with("..."));

        // Short enough text passes through unchanged.
        assert_eq!(truncate_text("short", 50), "short");
        assert_eq!(truncate_text(&"y".repeat(50), 50), "y".repeat(50));
    }

    #[test]
    fn test_truncation_is_character_exact() {
        // 4 three-byte characters; byte-indexed truncation would split one.
        let truncated = truncate_text("ありがとう", 3);
        assert_eq!(truncated, "ありが...");
        assert_eq!(truncated.chars().count(), 6);
    }

    #[test]
    fn test_request_text_gate_disables_capture() {
        let descriptor = query_descriptor();
        let config = InstrumentationConfig::builder()
            .capture_request_text(false)
            .build();
        let args = [CallArg::value(json!("SELECT secret FROM vault"))];

        let attributes = extract_pre(&descriptor, &config, &args);
        assert!(find(&attributes, "query.text").is_none());
    }

    #[test]
    fn test_response_metadata_gate_disables_capture() {
        let descriptor = query_descriptor();
        let config = InstrumentationConfig::builder()
            .capture_response_metadata(false)
            .build();

        let attributes = extract_post(&descriptor, &config, &json!({"id": "row_1"}));
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_namespace_prefixes_every_key() {
        let descriptor = query_descriptor();
        let config = InstrumentationConfig::builder()
            .attribute_namespace("acme.db")
            .build();
        let args = [CallArg::value(json!("SELECT 1"))];

        let attributes = extract_pre(&descriptor, &config, &args);
        assert!(find(&attributes, "acme.db.query.text").is_some());
        assert!(find(&attributes, "query.text").is_none());
    }

    #[test]
    fn test_join_transform() {
        let rule = AttributeRule::builder()
            .key("channels")
            .sources(vec![FieldSource::arg_path(0, "channels")])
            .transform(Transform::Join(",".to_string()))
            .build();
        let descriptor = OperationDescriptor::builder()
            .method("publish")
            .qualified_name("queue.publish")
            .span_name("queue.publish")
            .rules(AttributeRuleSet::builder().request(vec![rule]).build())
            .build();
        let config = InstrumentationConfig::default();
        let args = [CallArg::value(json!({"channels": ["a", "b", 3]}))];

        let attributes = extract_pre(&descriptor, &config, &args);
        assert_eq!(find(&attributes, "channels"), Some(&Value::from("a,b,3")));
    }

    #[test]
    fn test_malformed_shapes_are_omitted() {
        let descriptor = query_descriptor();
        let config = InstrumentationConfig::default();

        // Callback in the value position, object where a scalar is
        // expected, empty argument list: nothing extracted, nothing panics.
        let attributes = extract_pre(&descriptor, &config, &[]);
        assert!(attributes.is_empty());

        let args = [CallArg::callback(|_failure, _value| {})];
        let attributes = extract_pre(&descriptor, &config, &args);
        assert!(attributes.is_empty());

        let args = [CallArg::value(json!({"query": {"nested": true}}))];
        let attributes = extract_pre(&descriptor, &config, &args);
        assert!(find(&attributes, "query.text").is_none());
    }
}
