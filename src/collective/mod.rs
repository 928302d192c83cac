//! Hypercube collectives built entirely out of point-to-point `send`/`recv`
//! on a node whose cohort size is a power of two. Every dimension fold is a
//! single paired exchange; nothing here talks to the hub except through the
//! completion barrier each operation posts before returning.

mod broadcast;
mod gather;
mod reduce;
mod scatter;

pub use broadcast::broadcast;
pub use gather::{gather, gather_all};
pub use reduce::{reduce, reduce_all};
pub use scatter::scatter;

use anyhow::{Context, Result};

use crate::error::RuntimeError;
use crate::node::Node;

fn bit(value: i64, dimension: u32) -> i64 {
    (value >> dimension) & 1
}

fn partner(id: i64, dimension: u32) -> i64 {
    id ^ (1i64 << dimension)
}

/// Number of dimensions for a cohort of `n` nodes; errors if `n` is not a
/// positive power of two, since the hypercube fold has no fallback for
/// uneven cohorts.
fn dimensions(n: i64) -> Result<u32> {
    if n <= 0 || !(n as u64).is_power_of_two() {
        return Err(RuntimeError::ProtocolMisuse(format!(
            "collective operations require a power-of-two node count, got {n}"
        ))
        .into());
    }
    Ok((n as u64).trailing_zeros())
}

/// Split `list` into a low half (the first `ceil(len/2)` elements) and a
/// high half (the remainder), matching the scatter/gather combine rule.
fn split_ceil_half<T>(mut list: Vec<T>) -> (Vec<T>, Vec<T>) {
    let low_len = list.len().div_ceil(2);
    let high = list.split_off(low_len);
    (list, high)
}

/// Every collective shares one reserved barrier tag for its completion
/// rendezvous; safe because collectives run synchronously, one fully
/// drained before the next begins.
async fn complete(node: &Node) -> Result<()> {
    node.collective_barrier().await.context("collective completion barrier")
}
