//! Native object specifications produced by schema mappers

use crate::geometry::Point3;
use crate::ids::{NativeHandle, VariantTag};
use serde::{Deserialize, Serialize};

/// A native object registered under an external id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeRef {
    pub handle: NativeHandle,
    pub variant: VariantTag,
}

impl NativeRef {
    #[must_use]
    pub fn new(handle: NativeHandle, variant: impl Into<VariantTag>) -> Self {
        Self {
            handle,
            variant: variant.into(),
        }
    }
}

/// What the adapter should create or update
///
/// `payload` carries the target-schema fields; the engine never inspects it.
/// `axis` and `anchors` describe linear or curved members so that points
/// lying on them can be attached as internal points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeObjectSpec {
    pub handle: NativeHandle,
    pub variant: VariantTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Point3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<Vec<Point3>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchors: Vec<NativeHandle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_points: Vec<NativeHandle>,
}

impl NativeObjectSpec {
    #[must_use]
    pub fn new(handle: NativeHandle, variant: impl Into<VariantTag>) -> Self {
        Self {
            handle,
            variant: variant.into(),
            name: None,
            payload: serde_json::Value::Null,
            location: None,
            axis: None,
            anchors: Vec::new(),
            internal_points: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Point3) -> Self {
        self.location = Some(location);
        self
    }

    /// Axis polyline plus the handles of the points it is anchored to
    #[must_use]
    pub fn with_axis(mut self, axis: Vec<Point3>, anchors: Vec<NativeHandle>) -> Self {
        self.axis = Some(axis);
        self.anchors = anchors;
        self
    }

    /// Add internal points, skipping anchors and duplicates
    pub fn attach_internal_points(&mut self, handles: impl IntoIterator<Item = NativeHandle>) {
        for handle in handles {
            if handle != self.handle
                && !self.anchors.contains(&handle)
                && !self.internal_points.contains(&handle)
            {
                self.internal_points.push(handle);
            }
        }
    }

    /// Registry reference for this spec
    #[must_use]
    pub fn native_ref(&self) -> NativeRef {
        NativeRef::new(self.handle.clone(), self.variant.clone())
    }
}
