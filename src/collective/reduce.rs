//! Reduce-to-root: each dimension fold either forwards-and-drops-out or
//! receives-and-folds, until only `root` is left holding the answer.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{bit, complete, dimensions, partner};
use crate::node::Node;

/// Fold every node's `value` into `root` using `f`, walking dimensions low
/// to high. A node whose bit at dimension `d` diverges from `root`'s sends
/// its current accumulator to its dimension-`d` partner and drops out;
/// otherwise it receives its partner's accumulator and folds it in with
/// `f(received, own)`.
///
/// The result is only meaningful at `root`; other callers get back
/// whatever their accumulator held at the moment they dropped out.
pub async fn reduce<T, F>(node: &Node, root: i64, mut value: T, f: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: Fn(T, T) -> T,
{
    let k = dimensions(node.node_count())?;
    let id = node.id();

    for d in 0..k {
        let part = partner(id, d);
        if bit(root, d) != bit(id, d) {
            node.send(part, &value, 0)?;
            complete(node).await?;
            return Ok(value);
        }
        let received: T = node.recv_as(Some(part)).await?;
        value = f(received, value);
    }

    complete(node).await?;
    Ok(value)
}

/// [`reduce`] to a fixed root followed by a [`super::broadcast`] of the
/// result, so every node ends up with the same reduced value.
pub async fn reduce_all<T, F>(node: &Node, value: T, f: F) -> Result<T>
where
    T: Clone + Serialize + DeserializeOwned,
    F: Fn(T, T) -> T,
{
    const ROOT: i64 = 0;
    let reduced = reduce(node, ROOT, value, f).await?;
    let carried = if node.id() == ROOT { Some(reduced) } else { None };
    super::broadcast(node, ROOT, carried).await
}
