//! Graph walker
//!
//! Flattens an interchange graph into the ordered list of convertible nodes.
//! Depth-first, pre-order: a convertible node is emitted and not descended
//! into; any other node has its properties walked in declaration order.
//! Lists walk in order, maps in insertion order, scalars are ignored.
//!
//! A node reachable along several paths is handled once, at its first
//! encounter. A node reached again while it is still on the current path
//! closes a cycle: that edge is skipped and reported as
//! `Conflict("cycle detected")`.

use conduit_model::{ConversionError, ConversionResult, InterchangeGraph, InterchangeNode, NodeId, Value};
use indexmap::IndexSet;

/// Output of [`flatten`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    /// Convertible nodes in first-encounter order
    pub nodes: Vec<NodeId>,
    /// Cycles and dangling references met on the way
    pub errors: Vec<ConversionError>,
}

impl Flattened {
    /// The node list, or the first error if any was met
    pub fn into_result(self) -> ConversionResult<Vec<NodeId>> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.nodes),
        }
    }
}

/// Flatten the graph below `root`
pub fn flatten<F>(graph: &InterchangeGraph, root: NodeId, is_convertible: F) -> Flattened
where
    F: FnMut(&InterchangeNode) -> bool,
{
    let mut walker = Walker {
        graph,
        is_convertible,
        on_path: IndexSet::new(),
        seen: vec![false; graph.len()],
        out: Flattened::default(),
    };
    walker.visit(root);
    walker.out
}

struct Walker<'g, F> {
    graph: &'g InterchangeGraph,
    is_convertible: F,
    on_path: IndexSet<NodeId>,
    seen: Vec<bool>,
    out: Flattened,
}

impl<F> Walker<'_, F>
where
    F: FnMut(&InterchangeNode) -> bool,
{
    fn visit(&mut self, id: NodeId) {
        let graph = self.graph;
        let Some(node) = graph.node(id) else {
            self.out.errors.push(ConversionError::invalid_input(format!(
                "dangling node reference {id}"
            )));
            return;
        };
        if self.on_path.contains(&id) {
            self.out.errors.push(
                ConversionError::conflict("cycle detected").with_cause(node.external_id().cloned()),
            );
            return;
        }
        if std::mem::replace(&mut self.seen[id.0], true) {
            return;
        }

        if (self.is_convertible)(node) {
            self.out.nodes.push(id);
            return;
        }

        self.on_path.insert(id);
        for (_, value) in node.properties() {
            self.visit_value(value);
        }
        self.on_path.pop();
    }

    fn visit_value(&mut self, value: &Value) {
        match value {
            Value::Node(id) => self.visit(*id),
            Value::List(items) => items.iter().for_each(|v| self.visit_value(v)),
            Value::Map(map) => map.values().for_each(|v| self.visit_value(v)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_model::{ErrorKind, ExternalId, InterchangeNode};
    use pretty_assertions::assert_eq;

    fn convertible(node: &InterchangeNode) -> bool {
        node.type_tag().as_str() != "Collection"
    }

    fn ids(graph: &InterchangeGraph, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|id| {
                graph
                    .node(*id)
                    .and_then(InterchangeNode::external_id)
                    .map(ExternalId::to_string)
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn pre_order_first_encounter() {
        let mut g = InterchangeGraph::new();
        let a = g.add(InterchangeNode::new("Node").with_external_id("a"));
        let b = g.add(InterchangeNode::new("Node").with_external_id("b"));
        let c = g.add(InterchangeNode::new("Node").with_external_id("c"));
        let inner = g.add(
            InterchangeNode::new("Collection")
                .with_property("items", vec![Value::Node(b), Value::Node(a)]),
        );
        let mut map = indexmap::IndexMap::new();
        map.insert("z".to_string(), Value::Node(c));
        map.insert("y".to_string(), Value::Float(1.0));
        let root = g.add_root(
            InterchangeNode::new("Collection")
                .with_property("first", a)
                .with_property("scalar", 3)
                .with_property("nested", inner)
                .with_property("lookup", map),
        );

        let out = flatten(&g, root, convertible);
        assert!(out.errors.is_empty());
        assert_eq!(ids(&g, &out.nodes), vec!["a", "b", "c"]);
    }

    #[test]
    fn convertible_nodes_are_not_descended() {
        let mut g = InterchangeGraph::new();
        let hidden = g.add(InterchangeNode::new("Node").with_external_id("hidden"));
        let member = g.add(
            InterchangeNode::new("Element1D")
                .with_external_id("m")
                .with_property("end1Node", hidden),
        );
        let root = g.add_root(InterchangeNode::new("Collection").with_property("m", member));

        let out = flatten(&g, root, convertible);
        assert_eq!(ids(&g, &out.nodes), vec!["m"]);
    }

    #[test]
    fn cycle_is_reported_and_walk_continues() {
        let mut g = InterchangeGraph::new();
        let a = g.add(InterchangeNode::new("Node").with_external_id("a"));
        let loop_node = g.add(InterchangeNode::new("Collection").with_external_id("loop"));
        g.node_mut(loop_node).unwrap().set("self", loop_node);
        g.node_mut(loop_node).unwrap().set("a", a);
        let root = g.add_root(InterchangeNode::new("Collection").with_property("x", loop_node));

        let out = flatten(&g, root, convertible);
        assert_eq!(ids(&g, &out.nodes), vec!["a"]);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].kind, ErrorKind::Conflict);
        assert_eq!(out.errors[0].message, "cycle detected");
        assert!(out.into_result().is_err());
    }

    #[test]
    fn shared_containers_are_walked_once() {
        let mut g = InterchangeGraph::new();
        let a = g.add(InterchangeNode::new("Node").with_external_id("a"));
        let shared = g.add(InterchangeNode::new("Collection").with_property("a", a));
        let root = g.add_root(
            InterchangeNode::new("Collection")
                .with_property("left", shared)
                .with_property("right", shared),
        );
        let out = flatten(&g, root, convertible);
        assert_eq!(out.into_result().unwrap(), vec![a]);
    }
}
