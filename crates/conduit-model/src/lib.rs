//! Conduit Model - interchange graph and native-side primitives
//!
//! Shared vocabulary of the synchronization engine:
//! - [`InterchangeGraph`] arena of [`InterchangeNode`] property bags
//! - identifiers ([`ExternalId`], [`NativeHandle`], [`TypeTag`], [`VariantTag`])
//! - [`Placeholder`] outcomes persisted between runs
//! - [`NativeObjectSpec`] values handed to the native adapter
//! - [`Point3`] geometry and [`LengthUnit`] scaling
//! - the [`ErrorKind`] taxonomy
//!
//! # Example
//!
//! ```rust
//! use conduit_model::prelude::*;
//!
//! let mut graph = InterchangeGraph::new();
//! let a = graph.add(
//!     InterchangeNode::new("Node")
//!         .with_external_id("a1")
//!         .with_property("x", 1.0),
//! );
//! graph.add_root(InterchangeNode::new("Model").with_property("nodes", vec![Value::Node(a)]));
//! assert_eq!(graph.len(), 2);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod geometry;
pub mod ids;
pub mod json;
pub mod node;
pub mod placeholder;
pub mod spec;
pub mod units;
pub mod value;

pub use error::{ConversionError, ConversionResult, ErrorKind};
pub use geometry::{distance_to_line, distance_to_polyline, distance_to_segment, Point3};
pub use ids::{ExternalId, NativeHandle, NodeId, TypeTag, VariantTag};
pub use json::JsonImporter;
pub use node::{InterchangeGraph, InterchangeNode, NodeRef};
pub use placeholder::{Placeholder, PlaceholderSet, PlaceholderStatus};
pub use spec::{NativeObjectSpec, NativeRef};
pub use units::LengthUnit;
pub use value::Value;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with interchange graphs
    pub use crate::{
        ConversionError, ConversionResult, ErrorKind, ExternalId, InterchangeGraph,
        InterchangeNode, NativeHandle, NativeObjectSpec, NodeId, NodeRef, Placeholder,
        PlaceholderSet, PlaceholderStatus, Point3, TypeTag, Value, VariantTag,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
