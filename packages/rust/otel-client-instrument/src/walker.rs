//! Resource traversal and the instrumentation entry point.
//!
//! [`instrument_client`] walks a client's object graph, wrapping every
//! operation named by a [`ResourceDescriptor`] and descending into the
//! named sub-resource groups, to arbitrary depth. Wrapping rebinds the
//! method entry in place: the replacement extracts pre-call attributes,
//! opens a span, and hands the original method to the calling-convention
//! adapter. Everything else about the object is left untouched.
//!
//! Traversal rules:
//!
//! - Operations or resources a given client version does not expose are
//!   skipped silently.
//! - Plain data properties are never traversed or wrapped; naming one in a
//!   descriptor is a no-op.
//! - Each visited object is marked through the idempotency guard before it
//!   is wrapped. The marker doubles as the visited set, so objects
//!   reachable through several paths, or through cycles, are wrapped at
//!   most once and the walk always terminates.
//! - No object lock is held while descending into a child resource.
//!
//! Traversal order follows the descriptor (operations first, then child
//! resources, in declared order), so it is deterministic for a given
//! descriptor and client shape.

use crate::adapter;
use crate::client::{CallArg, ClientHandle, MethodFn};
use crate::config::InstrumentationConfig;
use crate::extractors::{extract_pre, OperationDescriptor};
use crate::lifecycle;
use crate::logger::Logger;
use crate::marker;
use bon::Builder;
use opentelemetry::global::{self, BoxedTracer};
use std::sync::Arc;

/// Module-specific logger
static LOGGER: Logger = Logger::const_new("walker");

/// Declares the instrumentable surface of one resource: its operations and
/// its nested resource groups. Descriptors nest to arbitrary depth.
#[derive(Builder, Debug, Clone, Default)]
pub struct ResourceDescriptor {
    /// Property name of this resource on its parent. Unused on the root.
    #[builder(into, default)]
    pub name: String,
    /// Operations to wrap on this resource.
    #[builder(default)]
    pub operations: Vec<OperationDescriptor>,
    /// Nested resource groups to descend into.
    #[builder(default)]
    pub resources: Vec<ResourceDescriptor>,
}

/// Instrument a client in place and hand the same reference back.
///
/// Repeated calls on the same client (or on a client reachable more than
/// once through the resource graph) are no-ops: each object is wrapped at
/// most once for the life of the process. The returned handle aliases the
/// object that was passed in; nothing about the client's externally
/// observed shape changes.
///
/// Environment overrides are applied to `config` here, once per call (see
/// [`InstrumentationConfig::resolve`]).
pub fn instrument_client(
    client: &ClientHandle,
    descriptor: &ResourceDescriptor,
    config: InstrumentationConfig,
) -> ClientHandle {
    let config = Arc::new(config.resolve());
    let tracer = Arc::new(global::tracer(config.tracer_name.clone()));
    walk(client, descriptor, &tracer, &config);
    client.clone()
}

fn walk(
    client: &ClientHandle,
    descriptor: &ResourceDescriptor,
    tracer: &Arc<BoxedTracer>,
    config: &Arc<InstrumentationConfig>,
) {
    let Some(object_id) = client.object_id() else {
        return;
    };
    if !marker::mark_and_check(object_id) {
        LOGGER.debug(format!(
            "walk: object {object_id} already instrumented, skipping"
        ));
        return;
    }

    client.with_object(|object| {
        for operation in &descriptor.operations {
            let Some(original) = object.method(&operation.method) else {
                LOGGER.debug(format!(
                    "walk: {} not present on this client, skipping",
                    operation.qualified_name
                ));
                continue;
            };
            let wrapped = wrap_method(
                original,
                Arc::new(operation.clone()),
                tracer.clone(),
                config.clone(),
            );
            object.set_method(&operation.method, wrapped);
        }
    });

    if !config.instrument_nested_resources {
        return;
    }
    for child in &descriptor.resources {
        // Resources absent in this client version are expected, not errors.
        if let Some(nested) = client.resource(&child.name) {
            walk(&nested, child, tracer, config);
        }
    }
}

/// Build the replacement method: extract, open a span, dispatch. The
/// replacement has the same shape as the original; its return value is
/// whatever the adapter passes through.
fn wrap_method(
    original: MethodFn,
    descriptor: Arc<OperationDescriptor>,
    tracer: Arc<BoxedTracer>,
    config: Arc<InstrumentationConfig>,
) -> MethodFn {
    Arc::new(move |args: &[CallArg]| {
        let attributes = extract_pre(&descriptor, &config, args);
        let handle = lifecycle::open_span(&tracer, &descriptor, &config, attributes);
        adapter::invoke(&original, args, handle)
    })
}
