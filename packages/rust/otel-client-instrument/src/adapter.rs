//! Calling-convention dispatch for wrapped invocations.
//!
//! The convention of a call is detected structurally at the call site, not
//! declared by the caller, because the same operation may be invoked in
//! callback or future style by different call sites of the same SDK:
//!
//! 1. A trailing [`CallArg::Callback`] selects the callback convention.
//!    The original method runs with a replacement callback that finalizes
//!    the span first (success when the error slot is empty, failure
//!    otherwise) and then forwards both arguments unchanged. The method's
//!    own immediate return value passes through untouched; callback-style
//!    APIs may use it for cancellation handles.
//! 2. Otherwise the method is invoked directly. A synchronous return
//!    finalizes immediately; a returned future is wrapped in
//!    [`TracedFuture`], which finalizes once when the inner future
//!    resolves.
//!
//! Every path hands the result, failure, or callback arguments through
//! exactly as the unwrapped method produced them. The engine is purely
//! observational: values are untouched, failures keep their identity, and
//! the future path adds no extra continuation hop.

use crate::client::{CallArg, Callback, MethodFn, MethodReturn};
use crate::lifecycle::{InvocationOutcome, SpanHandle};
use pin_project::pin_project;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{self, ready, Poll};

use crate::error::OpFailure;

/// Invoke `original` under the open span in `handle`, dispatching on the
/// calling convention in play.
pub(crate) fn invoke(original: &MethodFn, args: &[CallArg], handle: SpanHandle) -> MethodReturn {
    if let Some(user_callback) = trailing_callback(args) {
        return invoke_with_callback(original, args, handle, user_callback);
    }

    // The span stays active while the synchronous part of the call runs,
    // so nested instrumented calls parent under it.
    let returned = {
        let _active = handle.attach();
        original(args)
    };

    match returned {
        MethodReturn::Sync(result) => {
            match &result {
                Ok(value) => handle.finalize(InvocationOutcome::Success(Some(value))),
                Err(failure) => handle.finalize(InvocationOutcome::Failure(failure)),
            }
            MethodReturn::Sync(result)
        }
        MethodReturn::Async(inner) => MethodReturn::Async(Box::pin(TracedFuture {
            inner,
            handle: Some(handle),
        })),
    }
}

/// Callback-style detection: the last argument is an error-first function.
fn trailing_callback(args: &[CallArg]) -> Option<Callback> {
    match args.last() {
        Some(CallArg::Callback(callback)) => Some(callback.clone()),
        _ => None,
    }
}

fn invoke_with_callback(
    original: &MethodFn,
    args: &[CallArg],
    handle: SpanHandle,
    user_callback: Callback,
) -> MethodReturn {
    let call_cx = handle.context().clone();

    // The handle parks in a take-once slot: the span is finalized by
    // whichever callback invocation takes it first, and only that one.
    let slot = Arc::new(Mutex::new(Some(handle)));
    let replacement: Callback = Arc::new(move |failure: Option<&OpFailure>, value: Option<&Value>| {
        let taken = slot.lock().ok().and_then(|mut pending| pending.take());
        if let Some(handle) = taken {
            match failure {
                Some(failure) => handle.finalize(InvocationOutcome::Failure(failure)),
                None => handle.finalize(InvocationOutcome::Success(value)),
            }
        }
        user_callback(failure, value);
    });

    let mut patched = args.to_vec();
    let last = patched.len() - 1;
    patched[last] = CallArg::Callback(replacement);

    let _active = call_cx.attach();
    original(&patched)
}

/// Future wrapper that keeps the call's span ambient across suspension
/// points and finalizes it exactly once on completion.
#[pin_project]
struct TracedFuture<F> {
    #[pin]
    inner: F,
    handle: Option<SpanHandle>,
}

impl<F> Future for TracedFuture<F>
where
    F: Future<Output = Result<Value, OpFailure>>,
{
    type Output = Result<Value, OpFailure>;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = {
            let handle = this.handle.as_ref().expect("future polled after completion");
            let _active = handle.attach();
            ready!(this.inner.poll(cx))
        };
        let handle = this.handle.take().expect("future polled after completion");
        match &result {
            Ok(value) => handle.finalize(InvocationOutcome::Success(Some(value))),
            Err(failure) => handle.finalize(InvocationOutcome::Failure(failure)),
        }
        Poll::Ready(result)
    }
}
