//! Broadcast-from-root via recursive doubling: every node computes the
//! highest-order bit at which it differs from `root` — the single
//! dimension at which it first receives the value — then walks dimensions
//! low to high, forwarding to its partner on every dimension after that
//! point.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{complete, dimensions, partner};
use crate::node::Node;

/// Distribute `value` (meaningful only when supplied by `root`, `None`
/// everywhere else) to every node in the cohort.
pub async fn broadcast<T>(node: &Node, root: i64, value: Option<T>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let k = dimensions(node.node_count())?;
    let id = node.id();
    let relative = id ^ root;
    // -1 stands for "already has the value from the start" (root's case),
    // so every dimension for root falls into the "forward" branch below.
    let threshold: i64 = if relative == 0 {
        -1
    } else {
        i64::from(63 - (relative as u64).leading_zeros())
    };

    let mut current = value;
    for d in 0..k {
        let dd = i64::from(d);
        let part = partner(id, d);
        if dd < threshold {
            continue;
        } else if dd == threshold {
            let received: T = node.recv_as(Some(part)).await?;
            current = Some(received);
        } else {
            let held = current.as_ref().context("broadcast: forwarding before receiving a value")?;
            node.send(part, held, 0)?;
        }
    }

    complete(node).await?;
    current.context("broadcast: node never received a value")
}
