//! Schema mapper interface
//!
//! The per-field mapping between interchange nodes and one native schema
//! lives outside the engine. Mappers dispatch on the node's type tag.

use conduit_context::{ConversionContext, ExportContext};
use conduit_model::{
    ConversionError, ConversionResult, InterchangeNode, NativeObjectSpec, NodeRef, TypeTag,
};

/// Converts between interchange nodes and native object specs
pub trait SchemaMapper {
    /// Whether the walker should emit this node instead of descending into it
    fn can_convert_to_native(&self, node: &InterchangeNode) -> bool;

    /// Produce the native objects for one node
    ///
    /// Mappers consult [`ConversionContext::lookup`] before creating objects
    /// for ids that may already be converted, and allocate handles through
    /// the context. Returning an empty list marks the node as skipped.
    fn convert_to_native(
        &self,
        node: NodeRef<'_>,
        ctx: &mut ConversionContext,
    ) -> ConversionResult<Vec<NativeObjectSpec>>;

    /// Conversion priority of a type; lower converts first
    fn priority(&self, _type_tag: &TypeTag) -> i32 {
        0
    }

    /// Whether a native object can be exported
    fn can_convert_to_interchange(&self, _object: &NativeObjectSpec) -> bool {
        false
    }

    /// Produce the interchange node for one native object
    ///
    /// Dependencies are converted through [`ExportContext::get_or_convert`].
    fn convert_to_interchange(
        &self,
        object: &NativeObjectSpec,
        _ctx: &mut ExportContext,
    ) -> ConversionResult<InterchangeNode> {
        Err(ConversionError::skipped(format!(
            "export of {} is not supported",
            object.variant
        )))
    }
}

impl<M: SchemaMapper + ?Sized> SchemaMapper for &M {
    fn can_convert_to_native(&self, node: &InterchangeNode) -> bool {
        (**self).can_convert_to_native(node)
    }

    fn convert_to_native(
        &self,
        node: NodeRef<'_>,
        ctx: &mut ConversionContext,
    ) -> ConversionResult<Vec<NativeObjectSpec>> {
        (**self).convert_to_native(node, ctx)
    }

    fn priority(&self, type_tag: &TypeTag) -> i32 {
        (**self).priority(type_tag)
    }

    fn can_convert_to_interchange(&self, object: &NativeObjectSpec) -> bool {
        (**self).can_convert_to_interchange(object)
    }

    fn convert_to_interchange(
        &self,
        object: &NativeObjectSpec,
        ctx: &mut ExportContext,
    ) -> ConversionResult<InterchangeNode> {
        (**self).convert_to_interchange(object, ctx)
    }
}
