//! Idempotency guard for instrumented objects.
//!
//! A process-wide side table records which client objects have already been
//! wrapped, keyed by their process-unique object id. The table only ever
//! grows; entries live for the life of the process. Because ids are never
//! reused, a retired object can never be mistaken for a live one.
//!
//! The same table bounds the resource walker's recursion: an object
//! reachable through several paths, or through a cycle, is marked on first
//! visit and skipped on every later one. Marking applies independently per
//! object; wrapping a parent says nothing about its children.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

static INSTRUMENTED: OnceLock<Mutex<HashSet<u64>>> = OnceLock::new();

/// Check and set the marker in one step.
///
/// Returns `true` when the object was not yet instrumented (and is now
/// marked); `false` when it already carried the marker and the caller must
/// skip re-wrapping.
pub(crate) fn mark_and_check(object_id: u64) -> bool {
    let table = INSTRUMENTED.get_or_init(|| Mutex::new(HashSet::new()));
    match table.lock() {
        Ok(mut marked) => marked.insert(object_id),
        // A poisoned table means a wrap panicked mid-mark; skip rather
        // than risk double-wrapping.
        Err(_) => false,
    }
}
