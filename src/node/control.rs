//! Node-side bookkeeping for the two control-plane primitives that aren't
//! ordinary point-to-point traffic: barrier latches and the reserved tags
//! that drive them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// Tag used for the registration handshake's barrier. Distinct from
/// [`COMPLETION_TAG`] so a slow collective can never be confused with a
/// node still joining.
pub const INIT_BARRIER_TAG: i64 = -2;

/// Tag used by every collective operation's completion barrier. A single
/// reserved tag suffices because collectives are synchronous: one is fully
/// drained (including its completion barrier) before the caller can start
/// the next.
pub const COMPLETION_TAG: i64 = -1;

/// Per-tag release latches for in-flight barrier waits.
pub struct BarrierLatches {
    inner: Mutex<HashMap<i64, Arc<Notify>>>,
}

impl BarrierLatches {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    /// Register interest in `tag`'s release, returning the latch to wait on.
    /// Must be called (and its `notified()` future obtained) before the
    /// barrier post is sent, so a release that arrives immediately can't
    /// race ahead of the wait.
    pub fn register(&self, tag: i64) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.inner.lock().expect("barrier latches lock poisoned").insert(tag, notify.clone());
        notify
    }

    /// Fire and forget the latch for `tag`, if anyone is waiting on it.
    pub fn release(&self, tag: i64) {
        if let Some(notify) = self.inner.lock().expect("barrier latches lock poisoned").remove(&tag) {
            notify.notify_waiters();
        }
    }
}
