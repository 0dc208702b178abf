//! Dynamic client model for instrumentable SDK objects.
//!
//! Third-party SDK clients are modeled as [`ClientObject`]s: bags of named
//! methods, named nested sub-resources, and plain data properties. SDK
//! adapters populate a `ClientObject` once; the engine then rebinds method
//! entries in place without changing the object's externally observed shape
//! (same method names, same call behavior, same data properties).
//!
//! # Calling conventions
//!
//! A method receives its arguments as a slice of [`CallArg`] and yields a
//! [`MethodReturn`]:
//!
//! - `MethodReturn::Sync` for operations that produce their result (or
//!   failure) before returning.
//! - `MethodReturn::Async` for operations that hand back a future.
//! - Callback-style operations take a trailing [`CallArg::Callback`] and
//!   deliver their outcome through it as an error-first pair; their
//!   immediate return value (often `Sync(Ok(Value::Null))`, sometimes a
//!   cancellation handle) is unrelated to the outcome.
//!
//! Which convention a call uses is decided by the call site, not declared
//! up front: the same operation may be invoked with or without a trailing
//! callback by different callers.
//!
//! # Sharing and cycles
//!
//! [`ClientHandle`] is a cheaply cloneable reference; clones alias the same
//! object. Resource graphs may contain cycles (a sub-resource can point back
//! at an ancestor). No lock is ever held across a method invocation or a
//! descent into a child resource, so re-entrant clients cannot deadlock.

use crate::error::OpFailure;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Process-unique ids for [`ClientObject`]s, used by the idempotency guard.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Error-first callback: the first argument carries the failure (if any),
/// the second the result value.
pub type Callback = Arc<dyn Fn(Option<&OpFailure>, Option<&Value>) + Send + Sync>;

/// A callable method entry on a [`ClientObject`].
pub type MethodFn = Arc<dyn Fn(&[CallArg]) -> MethodReturn + Send + Sync>;

/// One positional argument of a method invocation.
#[derive(Clone)]
pub enum CallArg {
    /// A plain data argument.
    Value(Value),
    /// A caller-supplied completion callback.
    Callback(Callback),
}

impl CallArg {
    /// Build a data argument from anything that converts into a JSON value.
    pub fn value(value: impl Into<Value>) -> Self {
        CallArg::Value(value.into())
    }

    /// Build a callback argument from an error-first closure.
    pub fn callback(
        callback: impl Fn(Option<&OpFailure>, Option<&Value>) + Send + Sync + 'static,
    ) -> Self {
        CallArg::Callback(Arc::new(callback))
    }

    /// The data payload of this argument, if it is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            CallArg::Value(value) => Some(value),
            CallArg::Callback(_) => None,
        }
    }
}

impl std::fmt::Debug for CallArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallArg::Value(value) => f.debug_tuple("Value").field(value).finish(),
            CallArg::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// What invoking a method yields.
pub enum MethodReturn {
    /// The operation completed (or failed) synchronously.
    Sync(Result<Value, OpFailure>),
    /// The operation handed back a future that resolves later.
    Async(BoxFuture<'static, Result<Value, OpFailure>>),
}

impl MethodReturn {
    /// A synchronous success.
    pub fn ok(value: impl Into<Value>) -> Self {
        MethodReturn::Sync(Ok(value.into()))
    }

    /// A synchronous failure.
    pub fn err(failure: OpFailure) -> Self {
        MethodReturn::Sync(Err(failure))
    }

    /// A future-returning invocation.
    pub fn future(
        future: impl Future<Output = Result<Value, OpFailure>> + Send + 'static,
    ) -> Self {
        MethodReturn::Async(Box::pin(future))
    }

    /// Unwrap a synchronous result, panicking on the async variant.
    /// Intended for call sites that know the convention in play.
    pub fn into_sync(self) -> Result<Value, OpFailure> {
        match self {
            MethodReturn::Sync(result) => result,
            MethodReturn::Async(_) => panic!("expected a synchronous return"),
        }
    }

    /// Unwrap the future of an async return, panicking on the sync variant.
    pub fn into_future(self) -> BoxFuture<'static, Result<Value, OpFailure>> {
        match self {
            MethodReturn::Async(future) => future,
            MethodReturn::Sync(_) => panic!("expected a future-returning invocation"),
        }
    }
}

/// A client object: named methods, nested sub-resources, and plain data
/// properties. See the module docs for the overall model.
pub struct ClientObject {
    object_id: u64,
    methods: HashMap<String, MethodFn>,
    resources: HashMap<String, ClientHandle>,
    values: HashMap<String, Value>,
}

impl ClientObject {
    pub fn new() -> Self {
        Self {
            object_id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            methods: HashMap::new(),
            resources: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Add a method.
    pub fn with_method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&[CallArg]) -> MethodReturn + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Add a nested sub-resource.
    pub fn with_resource(mut self, name: impl Into<String>, resource: ClientHandle) -> Self {
        self.resources.insert(name.into(), resource);
        self
    }

    /// Add a plain data property. Data properties are never traversed or
    /// wrapped by the instrumentation engine.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Wrap this object in a shareable handle.
    pub fn into_handle(self) -> ClientHandle {
        ClientHandle(Arc::new(Mutex::new(self)))
    }

    pub(crate) fn object_id(&self) -> u64 {
        self.object_id
    }

    pub(crate) fn method(&self, name: &str) -> Option<MethodFn> {
        self.methods.get(name).cloned()
    }

    pub(crate) fn set_method(&mut self, name: &str, method: MethodFn) {
        self.methods.insert(name.to_string(), method);
    }

    pub(crate) fn resource(&self, name: &str) -> Option<ClientHandle> {
        self.resources.get(name).cloned()
    }

    pub(crate) fn value(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

impl Default for ClientObject {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClientObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientObject")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("values", &self.values)
            .finish()
    }
}

/// Shareable reference to a [`ClientObject`]. Clones alias the same object.
#[derive(Clone)]
pub struct ClientHandle(Arc<Mutex<ClientObject>>);

impl ClientHandle {
    pub fn new(object: ClientObject) -> Self {
        object.into_handle()
    }

    /// Look up a method and invoke it. The object lock is released before
    /// the method runs, so methods may re-enter the same client.
    ///
    /// Returns `None` when no method of that name exists (data properties
    /// are not callable).
    pub fn call(&self, name: &str, args: &[CallArg]) -> Option<MethodReturn> {
        let method = self.method(name)?;
        Some(method(args))
    }

    /// The method entry of that name, if present.
    pub fn method(&self, name: &str) -> Option<MethodFn> {
        self.with_object(|object| object.method(name)).flatten()
    }

    /// Install or replace a method after construction. Useful for clients
    /// whose methods need a handle to their own object.
    pub fn set_method(
        &self,
        name: impl Into<String>,
        method: impl Fn(&[CallArg]) -> MethodReturn + Send + Sync + 'static,
    ) {
        let name = name.into();
        self.with_object(|object| object.set_method(&name, Arc::new(method)));
    }

    /// The nested sub-resource of that name, if present.
    pub fn resource(&self, name: &str) -> Option<ClientHandle> {
        self.with_object(|object| object.resource(name)).flatten()
    }

    /// Attach a nested sub-resource after construction. Cyclic resource
    /// graphs are representable and handled by the instrumentation engine.
    pub fn set_resource(&self, name: impl Into<String>, resource: ClientHandle) {
        let name = name.into();
        self.with_object(|object| {
            object.resources.insert(name, resource);
        });
    }

    /// The plain data property of that name, if present.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.with_object(|object| object.value(name)).flatten()
    }

    pub(crate) fn object_id(&self) -> Option<u64> {
        self.with_object(|object| object.object_id())
    }

    pub(crate) fn with_object<R>(&self, f: impl FnOnce(&mut ClientObject) -> R) -> Option<R> {
        if let Ok(mut object) = self.0.lock() {
            Some(f(&mut object))
        } else {
            None
        }
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.lock() {
            Ok(object) => object.fmt(f),
            Err(_) => f.write_str("ClientHandle(<poisoned>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_sync_method() {
        let client = ClientObject::new()
            .with_method("echo", |args: &[CallArg]| {
                let first = args
                    .first()
                    .and_then(CallArg::as_value)
                    .cloned()
                    .unwrap_or(Value::Null);
                MethodReturn::ok(first)
            })
            .into_handle();

        let result = client
            .call("echo", &[CallArg::value(json!({"n": 1}))])
            .unwrap()
            .into_sync()
            .unwrap();
        assert_eq!(result, json!({"n": 1}));
    }

    #[test]
    fn test_missing_method_is_none() {
        let client = ClientObject::new().with_value("timeout", 30).into_handle();

        assert!(client.call("timeout", &[]).is_none());
        assert!(client.method("timeout").is_none());
        assert_eq!(client.value("timeout"), Some(json!(30)));
    }

    #[test]
    fn test_nested_resources() {
        let billing = ClientObject::new()
            .with_method("list", |_args: &[CallArg]| MethodReturn::ok(json!([])))
            .into_handle();
        let portal = ClientObject::new()
            .with_resource("billing", billing)
            .into_handle();
        let client = ClientObject::new()
            .with_resource("portal", portal)
            .into_handle();

        let nested = client.resource("portal").unwrap().resource("billing");
        assert!(nested.unwrap().method("list").is_some());
        assert!(client.resource("absent").is_none());
    }

    #[test]
    fn test_object_ids_are_unique() {
        let a = ClientObject::new().into_handle();
        let b = ClientObject::new().into_handle();
        assert_ne!(a.object_id(), b.object_id());
        assert_eq!(a.object_id(), a.clone().object_id());
    }

    #[test]
    fn test_method_can_reenter_client() {
        let client = ClientObject::new().into_handle();
        let inner = client.clone();
        client.set_method("outer", move |_args: &[CallArg]| {
            // Re-entering the same client must not deadlock.
            let value = inner.value("limit").unwrap_or(Value::Null);
            MethodReturn::ok(value)
        });

        let result = client.call("outer", &[]).unwrap().into_sync().unwrap();
        assert_eq!(result, Value::Null);
    }
}
