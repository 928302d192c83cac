//! Scatter-from-source: the mirror image of [`super::gather`]. Dimensions
//! are walked high to low; a node only takes part once its low-order bits
//! (below the current dimension) already agree with `source`'s, i.e. once
//! it has been reached by the fold from a higher dimension.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{bit, complete, dimensions, partner, split_ceil_half};
use crate::node::Node;

/// Split `source`'s `list` across the cohort; every other node's `list`
/// argument is ignored. A node currently holding a (sub)list keeps the
/// half matching its own bit at the current dimension and sends the other
/// half to its partner; the low half (first `ceil(n/2)` elements) always
/// goes to whichever side has bit `0`.
pub async fn scatter<T>(node: &Node, source: i64, list: Option<Vec<T>>) -> Result<Vec<T>>
where
    T: Serialize + DeserializeOwned,
{
    let n = node.node_count();
    let k = dimensions(n)?;
    let id = node.id();

    let mut current: Vec<T> = if id == source {
        list.ok_or_else(|| anyhow::anyhow!("scatter source {source} did not supply a list"))?
    } else {
        Vec::new()
    };

    for d in (0..k).rev() {
        let below_mask = (1i64 << d) - 1;
        if (id & below_mask) != (source & below_mask) {
            continue;
        }
        let part = partner(id, d);
        if bit(id, d) == bit(source, d) {
            let (low, high) = split_ceil_half(current);
            if bit(id, d) == 0 {
                node.send(part, &high, 0)?;
                current = low;
            } else {
                node.send(part, &low, 0)?;
                current = high;
            }
        } else {
            current = node.recv_as(Some(part)).await?;
        }
    }

    complete(node).await?;
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_nodes_matching_sources_low_bits_participate_at_a_dimension() {
        let source = 0b10;
        let d = 1;
        let below_mask = (1i64 << d) - 1;
        assert_eq!(0b00 & below_mask, source & below_mask);
        assert_ne!(0b01 & below_mask, source & below_mask);
    }
}
