//! Span lifecycle management for wrapped invocations.
//!
//! One [`SpanHandle`] is created per logical call and finalized exactly
//! once, whichever exit path the call takes. The finalize-once discipline
//! is structural, not checked at runtime: [`SpanHandle::finalize`] consumes
//! the handle by value, so a second finalize does not compile. The pending
//! state of a callback-style call is simply the un-finalized handle, parked
//! inside the replacement callback until the callback fires.
//!
//! The opened span is carried inside an [`opentelemetry::Context`] so it
//! can be made the ambient active span while the wrapped operation runs
//! (including across the suspension points of a future, see
//! `adapter::TracedFuture`). Nested instrumented calls parent under it
//! through the normal ambient-context mechanism.
//!
//! # Abandoned calls
//!
//! If a wrapped future is dropped before completion, the underlying SDK
//! span ends at drop time with whatever state it had. A call whose
//! continuation never fires but is kept alive leaves its span open
//! indefinitely. The engine deliberately provides no liveness timeout for
//! either case.

use crate::config::InstrumentationConfig;
use crate::error::{exception_attributes, normalize, OpFailure};
use crate::extractors::{extract_post, qualified_key, OperationDescriptor};
use crate::constants;
use opentelemetry::global::BoxedTracer;
use opentelemetry::trace::{Status, TraceContextExt, Tracer};
use opentelemetry::{Context, ContextGuard, KeyValue};
use serde_json::Value;
use std::sync::Arc;

/// How a completed invocation concluded.
pub(crate) enum InvocationOutcome<'a> {
    /// The operation produced a value (callback-style calls may complete
    /// without one).
    Success(Option<&'a Value>),
    /// The operation failed.
    Failure(&'a OpFailure),
}

/// The span of one in-flight invocation. Owned exclusively by that
/// invocation's execution path; never shared across calls.
pub(crate) struct SpanHandle {
    cx: Context,
    descriptor: Arc<OperationDescriptor>,
    config: Arc<InstrumentationConfig>,
}

/// Open a span for one invocation, parented under the ambient active span.
pub(crate) fn open_span(
    tracer: &BoxedTracer,
    descriptor: &Arc<OperationDescriptor>,
    config: &Arc<InstrumentationConfig>,
    mut attributes: Vec<KeyValue>,
) -> SpanHandle {
    attributes.push(KeyValue::new(
        qualified_key(&config.attribute_namespace, constants::attributes::OPERATION),
        descriptor.qualified_name.clone(),
    ));
    let parent = Context::current();
    let span = tracer
        .span_builder(descriptor.span_name.clone())
        .with_kind(descriptor.kind.clone())
        .with_attributes(attributes)
        .start_with_context(tracer, &parent);
    SpanHandle {
        cx: parent.with_span(span),
        descriptor: descriptor.clone(),
        config: config.clone(),
    }
}

impl SpanHandle {
    /// The context carrying this span, for nesting and propagation.
    pub(crate) fn context(&self) -> &Context {
        &self.cx
    }

    /// Make this span the ambient active span until the guard drops.
    pub(crate) fn attach(&self) -> ContextGuard {
        self.cx.clone().attach()
    }

    /// Close the span: post-call attributes and OK status on success, an
    /// exception event and error status on failure. Consuming `self` is
    /// what guarantees the span ends exactly once.
    pub(crate) fn finalize(self, outcome: InvocationOutcome<'_>) {
        let span = self.cx.span();
        match outcome {
            InvocationOutcome::Success(response) => {
                if let Some(response) = response {
                    for attribute in extract_post(&self.descriptor, &self.config, response) {
                        span.set_attribute(attribute);
                    }
                }
                span.set_status(Status::Ok);
            }
            InvocationOutcome::Failure(failure) => {
                let normalized = normalize(failure);
                span.add_event("exception", exception_attributes(&normalized));
                span.set_status(Status::error(normalized.message));
            }
        }
        span.end();
    }
}
