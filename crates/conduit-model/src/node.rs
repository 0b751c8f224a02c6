//! Interchange nodes and the graph arena that owns them
//!
//! An [`InterchangeNode`] is a tagged, dynamically-keyed property bag.
//! Nodes live in an [`InterchangeGraph`] arena and reference each other by
//! [`NodeId`]. Property access goes through explicit, checked accessors that
//! return [`ConversionError::invalid_input`] instead of reflecting at runtime.

use crate::error::{ConversionError, ConversionResult};
use crate::ids::{ExternalId, NodeId, TypeTag};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tagged property bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeNode {
    type_tag: TypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    external_id: Option<ExternalId>,
    #[serde(default)]
    properties: IndexMap<String, Value>,
}

impl InterchangeNode {
    /// Create an empty node of the given type
    #[inline]
    #[must_use]
    pub fn new(type_tag: impl Into<TypeTag>) -> Self {
        Self {
            type_tag: type_tag.into(),
            external_id: None,
            properties: IndexMap::new(),
        }
    }

    /// With external id
    #[inline]
    #[must_use]
    pub fn with_external_id(mut self, id: impl Into<ExternalId>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// With property (appended in declaration order)
    #[inline]
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set or replace a property, keeping its original position
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn set_external_id(&mut self, id: Option<ExternalId>) {
        self.external_id = id;
    }

    #[inline]
    #[must_use]
    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    #[inline]
    #[must_use]
    pub fn external_id(&self) -> Option<&ExternalId> {
        self.external_id.as_ref()
    }

    /// Properties in declaration order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Property names in declaration order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Optional numeric property; present-but-not-numeric is an error
    pub fn f64(&self, name: &str) -> ConversionResult<Option<f64>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                ConversionError::invalid_input(format!(
                    "{}.{name} must be numeric",
                    self.type_tag
                ))
            }),
        }
    }

    /// Required numeric property
    pub fn require_f64(&self, name: &str) -> ConversionResult<f64> {
        self.f64(name)?.ok_or_else(|| self.missing(name))
    }

    /// Optional string property
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Required string property
    pub fn require_str(&self, name: &str) -> ConversionResult<&str> {
        self.str(name).ok_or_else(|| self.missing(name))
    }

    /// Optional nested node reference
    #[must_use]
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.get(name).and_then(Value::as_node)
    }

    /// Required nested node reference
    pub fn require_child(&self, name: &str) -> ConversionResult<NodeId> {
        self.child(name).ok_or_else(|| self.missing(name))
    }

    /// Node references held by a list property, skipping non-node items
    #[must_use]
    pub fn children(&self, name: &str) -> Vec<NodeId> {
        self.get(name)
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_node).collect())
            .unwrap_or_default()
    }

    /// Case-insensitive lookup of a dynamic string property
    ///
    /// Blank values are treated as absent.
    #[must_use]
    pub fn dynamic_str(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    fn missing(&self, name: &str) -> ConversionError {
        ConversionError::invalid_input(format!("{}.{name} is required", self.type_tag))
            .with_cause(self.external_id.clone())
    }
}

/// Arena of interchange nodes with an optional root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterchangeGraph {
    nodes: Vec<InterchangeNode>,
    root: Option<NodeId>,
}

impl InterchangeGraph {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the arena
    pub fn add(&mut self, node: InterchangeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a node and mark it as the document root
    pub fn add_root(&mut self, node: InterchangeNode) -> NodeId {
        let id = self.add(node);
        self.root = Some(id);
        id
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&InterchangeNode> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut InterchangeNode> {
        self.nodes.get_mut(id.0)
    }

    /// Resolve a node id or fail with invalid input
    pub fn require(&self, id: NodeId) -> ConversionResult<&InterchangeNode> {
        self.node(id).ok_or_else(|| {
            ConversionError::invalid_input(format!("dangling node reference {id}"))
        })
    }

    /// Borrow a node together with its graph
    #[must_use]
    pub fn view(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.node(id).map(|node| NodeRef {
            graph: self,
            id,
            node,
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes with their ids, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &InterchangeNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

/// A node borrowed together with the graph that owns it
///
/// Lets schema mappers follow nested references without threading the graph
/// separately.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'g> {
    graph: &'g InterchangeGraph,
    id: NodeId,
    node: &'g InterchangeNode,
}

impl<'g> NodeRef<'g> {
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> &'g InterchangeNode {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &'g InterchangeGraph {
        self.graph
    }

    /// Optional nested node
    pub fn child(&self, name: &str) -> ConversionResult<Option<NodeRef<'g>>> {
        match self.node.child(name) {
            None => Ok(None),
            Some(id) => self.resolve(id).map(Some),
        }
    }

    /// Required nested node
    pub fn require_child(&self, name: &str) -> ConversionResult<NodeRef<'g>> {
        let id = self.node.require_child(name)?;
        self.resolve(id)
    }

    /// Nested nodes from a list property
    pub fn children(&self, name: &str) -> ConversionResult<Vec<NodeRef<'g>>> {
        self.node
            .children(name)
            .into_iter()
            .map(|id| self.resolve(id))
            .collect()
    }

    fn resolve(&self, id: NodeId) -> ConversionResult<NodeRef<'g>> {
        self.graph
            .view(id)
            .ok_or_else(|| {
                ConversionError::invalid_input(format!("dangling node reference {id}"))
            })
    }
}

impl std::ops::Deref for NodeRef<'_> {
    type Target = InterchangeNode;

    fn deref(&self) -> &Self::Target {
        self.node
    }
}
