//! Per-tag arrival counters backing the hub's barrier service call.
//!
//! A barrier tag is created lazily on first arrival and removed the moment
//! its counter reaches zero, so tags are reusable across successive
//! collectives and application-level barriers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type BarrierTable = Arc<Mutex<HashMap<i64, usize>>>;

pub fn new_barrier_table() -> BarrierTable {
    Arc::new(Mutex::new(HashMap::new()))
}

/// Record one arrival at `tag`, out of an expected `cohort_size`. Returns
/// `true` exactly once per tag: when this arrival is the last one expected.
pub fn arrive(table: &BarrierTable, tag: i64, cohort_size: usize) -> bool {
    let mut guard = table.lock().expect("barrier table lock poisoned");
    let remaining = guard.entry(tag).or_insert(cohort_size);
    *remaining = remaining.saturating_sub(1);
    let complete = *remaining == 0;
    if complete {
        guard.remove(&tag);
    }
    complete
}
