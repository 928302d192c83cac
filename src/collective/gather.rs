//! Gather-to-root: the same dimension walk as [`super::reduce`], but
//! combining lists by concatenation (ordered by id) instead of folding with
//! a reducer function.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{bit, complete, dimensions, partner};
use crate::node::Node;

/// Collect every node's `list` at `root`, in id order. Mirrors [`reduce`]'s
/// send/receive decision; on receive, the numerically lower id of the pair
/// appends the partner's list to its own, the higher id prepends it, so the
/// final order at root always runs from id 0 upward.
///
/// Non-root callers get back an empty vector; their partial accumulator is
/// not meaningful once they drop out.
///
/// [`reduce`]: super::reduce::reduce
pub async fn gather<T>(node: &Node, root: i64, mut list: Vec<T>) -> Result<Vec<T>>
where
    T: Serialize + DeserializeOwned,
{
    let k = dimensions(node.node_count())?;
    let id = node.id();

    for d in 0..k {
        let part = partner(id, d);
        if bit(root, d) != bit(id, d) {
            node.send(part, &list, 0)?;
            complete(node).await?;
            return Ok(Vec::new());
        }
        let received: Vec<T> = node.recv_as(Some(part)).await?;
        if bit(id, d) == 0 {
            list.extend(received);
        } else {
            let mut combined = received;
            combined.extend(list);
            list = combined;
        }
    }

    complete(node).await?;
    Ok(list)
}

/// [`gather`] to a fixed root followed by a [`super::broadcast`] of the
/// assembled list, so every node ends up with the same full list.
pub async fn gather_all<T>(node: &Node, list: Vec<T>) -> Result<Vec<T>>
where
    T: Clone + Serialize + DeserializeOwned,
{
    const ROOT: i64 = 0;
    let gathered = gather(node, ROOT, list).await?;
    let carried = if node.id() == ROOT { Some(gathered) } else { None };
    super::broadcast(node, ROOT, carried).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_id_appends_high_id_prepends() {
        // id=0 is low at dimension 0 relative to partner id=1.
        assert_eq!(bit(0, 0), 0);
        assert_eq!(bit(1, 0), 1);
    }
}
