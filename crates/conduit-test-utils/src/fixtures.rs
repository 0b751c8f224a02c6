//! Interchange documents used across the engine tests

use crate::mapper::{ELEMENT_1D, NODE};
use conduit_model::{InterchangeGraph, InterchangeNode, NodeId, Value};

/// Add a named `Node` at `(x, y, z)` meters
pub fn point(graph: &mut InterchangeGraph, id: &str, x: f64, y: f64, z: f64) -> NodeId {
    graph.add(
        InterchangeNode::new(NODE)
            .with_external_id(id)
            .with_property("name", id.to_uppercase())
            .with_property("x", x)
            .with_property("y", y)
            .with_property("z", z),
    )
}

/// Add an unnamed `Node` without external id
pub fn anonymous_point(graph: &mut InterchangeGraph, x: f64, y: f64, z: f64) -> NodeId {
    graph.add(
        InterchangeNode::new(NODE)
            .with_property("x", x)
            .with_property("y", y)
            .with_property("z", z),
    )
}

/// Add an `Element1D` between two existing nodes
pub fn member(graph: &mut InterchangeGraph, id: &str, start: NodeId, end: NodeId) -> NodeId {
    graph.add(
        InterchangeNode::new(ELEMENT_1D)
            .with_external_id(id)
            .with_property("end1Node", start)
            .with_property("end2Node", end)
            .with_property("section", "HEA200"),
    )
}

/// Add a node of any type with only an external id
pub fn plain(graph: &mut InterchangeGraph, type_tag: &str, id: &str) -> NodeId {
    graph.add(InterchangeNode::new(type_tag).with_external_id(id))
}

/// Add the `Model` root listing `nodes` and `elements`
pub fn model(graph: &mut InterchangeGraph, nodes: &[NodeId], elements: &[NodeId]) -> NodeId {
    let list = |ids: &[NodeId]| -> Vec<Value> { ids.iter().copied().map(Value::Node).collect() };
    graph.add_root(
        InterchangeNode::new("Model")
            .with_property("units", "m")
            .with_property("nodes", list(nodes))
            .with_property("elements", list(elements)),
    )
}

/// Two points `a1`, `b1` and the member `m1` between them
pub fn frame() -> InterchangeGraph {
    let mut graph = InterchangeGraph::new();
    let a = point(&mut graph, "a1", 0.0, 0.0, 0.0);
    let b = point(&mut graph, "b1", 5.0, 0.0, 0.0);
    let m = member(&mut graph, "m1", a, b);
    model(&mut graph, &[a, b], &[m]);
    graph
}

/// [`frame`] without the member
pub fn frame_without_member() -> InterchangeGraph {
    let mut graph = InterchangeGraph::new();
    let a = point(&mut graph, "a1", 0.0, 0.0, 0.0);
    let b = point(&mut graph, "b1", 5.0, 0.0, 0.0);
    model(&mut graph, &[a, b], &[]);
    graph
}

/// A row of `count` points one meter apart, chained by members
pub fn chain(count: usize) -> InterchangeGraph {
    let mut graph = InterchangeGraph::new();
    let nodes: Vec<NodeId> = (0..count)
        .map(|i| point(&mut graph, &format!("n{i}"), i as f64, 0.0, 0.0))
        .collect();
    let elements: Vec<NodeId> = nodes
        .windows(2)
        .enumerate()
        .map(|(i, pair)| member(&mut graph, &format!("e{i}"), pair[0], pair[1]))
        .collect();
    model(&mut graph, &nodes, &elements);
    graph
}

/// The [`frame`] document as producer JSON
pub const FRAME_JSON: &str = r#"{
  "speckle_type": "Model",
  "units": "m",
  "nodes": [
    { "speckle_type": "Node", "applicationId": "a1", "name": "A1", "x": 0, "y": 0, "z": 0 },
    { "speckle_type": "Node", "applicationId": "b1", "name": "B1", "x": 5, "y": 0, "z": 0 }
  ],
  "elements": [
    {
      "speckle_type": "Element1D",
      "applicationId": "m1",
      "section": "HEA200",
      "end1Node": { "speckle_type": "Node", "applicationId": "a1", "name": "A1", "x": 0, "y": 0, "z": 0 },
      "end2Node": { "speckle_type": "Node", "applicationId": "b1", "name": "B1", "x": 5, "y": 0, "z": 0 }
    }
  ]
}"#;
