//! Generic OpenTelemetry method-interception instrumentation for SDK clients.
//!
//! This crate wraps the methods of arbitrary client objects (database
//! drivers, sandbox runtimes, billing APIs, mail senders, message queues)
//! so that every invocation produces a well-formed span, without changing
//! the call's inputs, outputs, or calling convention. It is the shared
//! engine under per-product integrations: the integrations supply
//! descriptors and attribute rules, this crate supplies everything that is
//! hard to get right once per SDK.
//!
//! # Features
//!
//! - **Three calling conventions**: synchronous returns, future-returning
//!   operations, and error-first callbacks, detected structurally at each
//!   call site
//! - **Idempotent wrapping**: a client (or anything reachable from it,
//!   cycles included) is wrapped at most once per process
//! - **Nested resource trees**: one instrumentation call at the root walks
//!   sub-resource groups of arbitrary depth
//! - **Defensive attribute extraction**: rule-driven, total, polymorphic
//!   over request/response shapes, with text truncation and capture flags
//! - **Uniform error reporting**: structured errors and bare failure
//!   values both normalize into standard exception events
//!
//! # Architecture
//!
//! The crate is organized into several modules, each handling one aspect
//! of the engine:
//!
//! - `client`: the dynamic client model SDK adapters populate
//! - `walker`: resource traversal and the [`instrument_client`] entry point
//! - `marker`: the process-wide idempotency guard
//! - `adapter`: calling-convention detection and dispatch
//! - `lifecycle`: span open/finalize with a structural finalize-once rule
//! - `extractors`: descriptors, attribute rules, and extraction
//! - `error`: failure values and error normalization
//! - `config`: per-integration configuration with environment overrides
//!
//! Control flow for one wrapped call: the installed replacement method
//! extracts pre-call attributes, opens a span as a child of the ambient
//! active span, invokes the original method under that span, extracts
//! post-call attributes from the result, and finalizes the span with OK or
//! error status on every exit path. The caller observes exactly what the
//! unwrapped method would have produced.
//!
//! # Quick Start
//!
//! ```
//! use otel_client_instrument::{
//!     instrument_client, AttributeRule, AttributeRuleSet, CallArg, ClientObject, FieldSource,
//!     InstrumentationConfig, MethodReturn, OperationDescriptor, ResourceDescriptor, Transform,
//! };
//! use serde_json::json;
//!
//! // Describe the instrumentable surface once, per integration.
//! let descriptor = ResourceDescriptor::builder()
//!     .operations(vec![OperationDescriptor::builder()
//!         .method("query")
//!         .qualified_name("db.query")
//!         .span_name("db.query")
//!         .rules(
//!             AttributeRuleSet::builder()
//!                 .request(vec![AttributeRule::builder()
//!                     .key("query.text")
//!                     .sources(vec![FieldSource::arg_path(0, "query"), FieldSource::arg(0)])
//!                     .transform(Transform::Truncate)
//!                     .build()])
//!                 .build(),
//!         )
//!         .build()])
//!     .build();
//!
//! // An SDK adapter populates the dynamic client model.
//! let client = ClientObject::new()
//!     .with_method("query", |_args: &[CallArg]| MethodReturn::ok(json!({"rows": []})))
//!     .into_handle();
//!
//! // Wrap it; calls now produce spans through the global tracer provider.
//! let client = instrument_client(&client, &descriptor, InstrumentationConfig::default());
//! let result = client
//!     .call("query", &[CallArg::value(json!("SELECT 1"))])
//!     .unwrap()
//!     .into_sync()
//!     .unwrap();
//! assert_eq!(result, json!({"rows": []}));
//! ```
//!
//! # Configuration
//!
//! [`InstrumentationConfig`] controls the tracer name, request-text and
//! response-metadata capture, the truncation boundary, nested-resource
//! descent, and the attribute namespace. Environment variables override
//! programmatic values at instrumentation time; see the `config` module
//! docs for the full list.
//!
//! # Error Handling
//!
//! Instrumentation is fail-open with respect to tracing and transparent
//! with respect to the wrapped operation: extraction problems silently
//! omit attributes, engine diagnostics go to the internal logger, and the
//! only failures a caller ever sees are the ones the underlying operation
//! itself produced, unchanged.
//!
//! # Limitations
//!
//! A call whose continuation never fires (for example a future abandoned
//! by an external timeout but never dropped) leaves its span open
//! indefinitely; the engine provides no liveness timeout. Dropping such a
//! future ends the span at drop time with the state it had.

mod adapter;
mod client;
mod config;
pub mod constants;
mod error;
mod extractors;
mod lifecycle;
pub mod logger;
mod marker;
mod walker;

pub use client::{CallArg, Callback, ClientHandle, ClientObject, MethodFn, MethodReturn};
pub use config::InstrumentationConfig;
pub use error::{normalize, NormalizedError, OpFailure};
pub use extractors::{
    extract_post, extract_pre, AttributeRule, AttributeRuleSet, CaptureGate, FieldSource,
    OperationDescriptor, Transform,
};
pub use walker::{instrument_client, ResourceDescriptor};
