//! Small structural schema used by the engine tests
//!
//! | type        | native objects                       | priority |
//! |-------------|--------------------------------------|----------|
//! | `Node`      | one `point`                          | 0        |
//! | `Element1D` | one `member`, plus any missing ends  | 10       |
//! | `Note`      | none (skipped)                       | 5        |
//! | `Broken`    | invalid input                        | 5        |
//! | `Crash`     | fatal                                | 5        |

use conduit_context::{ConversionContext, ExportContext};
use conduit_engine::SchemaMapper;
use conduit_model::{
    ConversionError, ConversionResult, InterchangeNode, NativeHandle, NativeObjectSpec, NodeRef,
    Point3, TypeTag, Value, VariantTag,
};
use serde_json::json;

pub const NODE: &str = "Node";
pub const ELEMENT_1D: &str = "Element1D";
pub const NOTE: &str = "Note";
pub const BROKEN: &str = "Broken";
pub const CRASH: &str = "Crash";

pub const POINT: &str = "point";
pub const MEMBER: &str = "member";

/// Table-driven mapper for points and members
#[derive(Debug, Clone, Copy, Default)]
pub struct TableMapper;

impl TableMapper {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn point_variant() -> VariantTag {
        VariantTag::new(POINT)
    }

    fn point_spec(handle: NativeHandle, name: &str, location: Point3) -> NativeObjectSpec {
        NativeObjectSpec::new(handle, POINT)
            .with_name(name)
            .with_location(location)
            .with_payload(json!({ "x": location.x, "y": location.y, "z": location.z }))
    }

    fn convert_node(
        node: NodeRef<'_>,
        ctx: &mut ConversionContext,
    ) -> ConversionResult<Vec<NativeObjectSpec>> {
        let location = Point3::from_node(&node)?;
        let resolved = ctx.resolve_point(location, node.dynamic_str("name"), &Self::point_variant())?;
        Ok(vec![Self::point_spec(resolved.handle, &resolved.name, location)])
    }

    /// Handle of a member end, placing the point if nothing exists there
    fn end_point(
        end: NodeRef<'_>,
        ctx: &mut ConversionContext,
        specs: &mut Vec<NativeObjectSpec>,
    ) -> ConversionResult<(NativeHandle, Point3)> {
        let location = Point3::from_node(&end)?;
        let variant = Self::point_variant();
        if let Some(handle) = end
            .external_id()
            .and_then(|id| ctx.lookup(id, &variant))
            .and_then(|handles| handles.into_iter().next())
        {
            return Ok((handle, location));
        }
        let resolved = ctx.resolve_point(location, end.dynamic_str("name"), &variant)?;
        if resolved.created {
            specs.push(Self::point_spec(resolved.handle.clone(), &resolved.name, location));
        }
        Ok((resolved.handle, location))
    }

    fn convert_member(
        node: NodeRef<'_>,
        ctx: &mut ConversionContext,
    ) -> ConversionResult<Vec<NativeObjectSpec>> {
        let mut specs = Vec::new();
        let (start, a) = Self::end_point(node.require_child("end1Node")?, ctx, &mut specs)?;
        let (end, b) = Self::end_point(node.require_child("end2Node")?, ctx, &mut specs)?;
        if a.distance(b) <= ctx.epsilon() {
            return Err(ConversionError::invalid_input("zero-length member"));
        }
        let handle = ctx.allocate_handle()?;
        let section = node.str("section").unwrap_or("default");
        specs.push(
            NativeObjectSpec::new(handle, MEMBER)
                .with_axis(vec![a, b], vec![start, end])
                .with_payload(json!({ "section": section })),
        );
        Ok(specs)
    }

    fn location(object: &NativeObjectSpec) -> ConversionResult<Point3> {
        object.location.ok_or_else(|| {
            ConversionError::invalid_input(format!("{} has no location", object.handle))
        })
    }
}

impl SchemaMapper for TableMapper {
    fn can_convert_to_native(&self, node: &InterchangeNode) -> bool {
        matches!(
            node.type_tag().as_str(),
            NODE | ELEMENT_1D | NOTE | BROKEN | CRASH
        )
    }

    fn convert_to_native(
        &self,
        node: NodeRef<'_>,
        ctx: &mut ConversionContext,
    ) -> ConversionResult<Vec<NativeObjectSpec>> {
        match node.type_tag().as_str() {
            NODE => Self::convert_node(node, ctx),
            ELEMENT_1D => Self::convert_member(node, ctx),
            NOTE => Ok(Vec::new()),
            BROKEN => Err(ConversionError::invalid_input("broken element")),
            CRASH => Err(ConversionError::fatal("mapper crashed")),
            other => Err(ConversionError::skipped(format!("{other} is not supported"))),
        }
    }

    fn priority(&self, type_tag: &TypeTag) -> i32 {
        match type_tag.as_str() {
            NODE => 0,
            ELEMENT_1D => 10,
            _ => 5,
        }
    }

    fn can_convert_to_interchange(&self, object: &NativeObjectSpec) -> bool {
        matches!(object.variant.as_str(), POINT | MEMBER)
    }

    fn convert_to_interchange(
        &self,
        object: &NativeObjectSpec,
        ctx: &mut ExportContext,
    ) -> ConversionResult<InterchangeNode> {
        match object.variant.as_str() {
            POINT => {
                let p = Self::location(object)?;
                let mut node = InterchangeNode::new(NODE)
                    .with_property("x", p.x)
                    .with_property("y", p.y)
                    .with_property("z", p.z);
                if let Some(name) = &object.name {
                    node.set("name", name.as_str());
                }
                Ok(node)
            }
            MEMBER => {
                let [start, end] = object.anchors.as_slice() else {
                    return Err(ConversionError::invalid_input(format!(
                        "{} must have two anchors",
                        object.handle
                    )));
                };
                let expected = TypeTag::new(NODE);
                let mut ends = Vec::with_capacity(2);
                for anchor in [start, end] {
                    let id = ctx.get_or_convert(anchor, Some(&expected), |ctx, point| {
                        self.convert_to_interchange(point, ctx)
                    })?;
                    ends.push(Value::Node(id));
                }
                let mut node = InterchangeNode::new(ELEMENT_1D);
                for (name, end) in ["end1Node", "end2Node"].into_iter().zip(ends) {
                    node.set(name, end);
                }
                if let Some(section) = object.payload.get("section").and_then(|v| v.as_str()) {
                    node.set("section", section);
                }
                Ok(node)
            }
            other => Err(ConversionError::skipped(format!(
                "export of {other} is not supported"
            ))),
        }
    }
}
