//! Dependency scheduler
//!
//! Orders pending nodes by the schema mapper's type priority. The sort is
//! stable: nodes of equal priority keep their flatten order.

use crate::mapper::SchemaMapper;
use conduit_model::{InterchangeGraph, NodeId};

/// Stable ascending sort by a priority key
pub fn order_by<T, K, F>(items: &mut [T], priority: F)
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    items.sort_by_key(priority);
}

/// Order flattened nodes with the mapper's priority table
///
/// Ids missing from the graph sort last.
pub fn schedule<M>(graph: &InterchangeGraph, nodes: &mut [NodeId], mapper: &M)
where
    M: SchemaMapper + ?Sized,
{
    order_by(nodes, |id| {
        graph
            .node(*id)
            .map_or(i32::MAX, |node| mapper.priority(node.type_tag()))
    });
}
