//! Generic JSON importer
//!
//! Builds an [`InterchangeGraph`] from any JSON document: objects carrying
//! the type key become nodes, every other value maps onto [`Value`]. The
//! importer does not know any particular producer's schema.

use crate::error::{ConversionError, ConversionResult};
use crate::ids::{ExternalId, NodeId};
use crate::node::{InterchangeGraph, InterchangeNode};
use crate::value::Value;
use indexmap::IndexMap;
use serde_json::Value as Json;

/// Type tag given to a synthetic root wrapping a non-node document
pub const COLLECTION_TYPE: &str = "Collection";

/// Property of the synthetic root holding the document's top-level value
pub const ELEMENTS_PROPERTY: &str = "elements";

/// JSON to interchange graph importer
#[derive(Debug, Clone)]
pub struct JsonImporter {
    type_key: String,
    id_key: String,
}

impl Default for JsonImporter {
    fn default() -> Self {
        Self {
            type_key: "speckle_type".to_string(),
            id_key: "applicationId".to_string(),
        }
    }
}

impl JsonImporter {
    #[must_use]
    pub fn new(type_key: impl Into<String>, id_key: impl Into<String>) -> Self {
        Self {
            type_key: type_key.into(),
            id_key: id_key.into(),
        }
    }

    /// Parse and import a JSON document
    pub fn import_str(&self, text: &str) -> ConversionResult<InterchangeGraph> {
        let json: Json = serde_json::from_str(text)
            .map_err(|e| ConversionError::invalid_input(format!("malformed document: {e}")))?;
        Ok(self.import(&json))
    }

    /// Import an already-parsed document
    ///
    /// If the top-level value is not a node it is wrapped in a
    /// [`COLLECTION_TYPE`] root under [`ELEMENTS_PROPERTY`].
    #[must_use]
    pub fn import(&self, json: &Json) -> InterchangeGraph {
        let mut graph = InterchangeGraph::new();
        let top = self.value(json, &mut graph);
        let root = match top {
            Value::Node(id) => id,
            other => graph.add(
                InterchangeNode::new(COLLECTION_TYPE).with_property(ELEMENTS_PROPERTY, other),
            ),
        };
        graph.set_root(root);
        graph
    }

    fn value(&self, json: &Json, graph: &mut InterchangeGraph) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => {
                Value::List(items.iter().map(|item| self.value(item, graph)).collect())
            }
            Json::Object(map) => match map.get(&self.type_key).and_then(Json::as_str) {
                Some(type_tag) => Value::Node(self.node(type_tag, map, graph)),
                None => Value::Map(
                    map.iter()
                        .map(|(k, v)| (k.clone(), self.value(v, graph)))
                        .collect::<IndexMap<_, _>>(),
                ),
            },
        }
    }

    fn node(
        &self,
        type_tag: &str,
        map: &serde_json::Map<String, Json>,
        graph: &mut InterchangeGraph,
    ) -> NodeId {
        let mut node = InterchangeNode::new(type_tag);
        node.set_external_id(map.get(&self.id_key).and_then(external_id));
        for (key, value) in map {
            if key == &self.type_key || key == &self.id_key {
                continue;
            }
            let value = self.value(value, graph);
            node.set(key.clone(), value);
        }
        graph.add(node)
    }
}

fn external_id(json: &Json) -> Option<ExternalId> {
    match json {
        Json::String(s) if !s.trim().is_empty() => Some(ExternalId::new(s.clone())),
        Json::Number(n) => Some(ExternalId::new(n.to_string())),
        _ => None,
    }
}
