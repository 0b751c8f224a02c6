//! Export context (native to interchange)
//!
//! Caches produced nodes by native handle so every native object is
//! converted at most once per export, and dependencies can be converted on
//! demand.

use crate::error::ContextError;
use crate::report::ConversionReport;
use conduit_model::{
    ConversionError, ConversionResult, ExternalId, InterchangeGraph, InterchangeNode,
    NativeHandle, NativeObjectSpec, NodeId, TypeTag,
};
use indexmap::{IndexMap, IndexSet};

/// Per-export state
#[derive(Debug, Default)]
pub struct ExportContext {
    sources: IndexMap<NativeHandle, NativeObjectSpec>,
    graph: InterchangeGraph,
    cache: IndexMap<NativeHandle, NodeId>,
    in_progress: IndexSet<NativeHandle>,
    native_id_prefix: Option<String>,
    report: ConversionReport,
}

impl ExportContext {
    /// Context over a batch of native objects
    pub fn new(
        objects: impl IntoIterator<Item = NativeObjectSpec>,
        native_id_prefix: Option<String>,
    ) -> Self {
        Self {
            sources: objects
                .into_iter()
                .map(|o| (o.handle.clone(), o))
                .collect(),
            native_id_prefix,
            ..Self::default()
        }
    }

    /// Native object by handle, if part of the batch
    #[must_use]
    pub fn source(&self, handle: &NativeHandle) -> Option<&NativeObjectSpec> {
        self.sources.get(handle)
    }

    /// Handles of the batch in input order
    #[must_use]
    pub fn source_handles(&self) -> Vec<NativeHandle> {
        self.sources.keys().cloned().collect()
    }

    /// Node previously produced for `handle`
    #[must_use]
    pub fn cached(&self, handle: &NativeHandle) -> Option<NodeId> {
        self.cache.get(handle).copied()
    }

    /// Return the cached node or convert the source object now
    ///
    /// A cached node whose type differs from `expected` is a conflict, as is
    /// re-entering an object that is still being converted.
    pub fn get_or_convert<F>(
        &mut self,
        handle: &NativeHandle,
        expected: Option<&TypeTag>,
        convert: F,
    ) -> ConversionResult<NodeId>
    where
        F: FnOnce(&mut Self, &NativeObjectSpec) -> ConversionResult<InterchangeNode>,
    {
        if let Some(id) = self.cached(handle) {
            let node = self.graph.require(id)?;
            if let Some(expected) = expected {
                if node.type_tag() != expected {
                    return Err(ConversionError::conflict(format!(
                        "{handle} was exported as {}, requested as {expected}",
                        node.type_tag()
                    )));
                }
            }
            return Ok(id);
        }

        if !self.in_progress.insert(handle.clone()) {
            return Err(ContextError::Cycle.into());
        }
        let object = self.sources.get(handle).cloned().ok_or_else(|| {
            ConversionError::invalid_input(format!("{handle} is not part of the export"))
        });
        let result = object.and_then(|object| convert(self, &object));
        self.in_progress.shift_remove(handle);

        let mut node = result?;
        if node.external_id().is_none() {
            node.set_external_id(Some(self.external_id_for(handle)));
        }
        let id = self.graph.add(node);
        self.cache.insert(handle.clone(), id);
        Ok(id)
    }

    /// `native_id_prefix + handle`
    #[must_use]
    pub fn external_id_for(&self, handle: &NativeHandle) -> ExternalId {
        let prefix = self.native_id_prefix.as_deref().unwrap_or_default();
        ExternalId::new(format!("{prefix}{handle}"))
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &InterchangeGraph {
        &self.graph
    }

    #[inline]
    pub fn report_mut(&mut self) -> &mut ConversionReport {
        &mut self.report
    }

    #[inline]
    #[must_use]
    pub fn report(&self) -> &ConversionReport {
        &self.report
    }

    /// Exported node ids in conversion order
    #[must_use]
    pub fn exported(&self) -> Vec<NodeId> {
        self.cache.values().copied().collect()
    }

    /// Finish, returning the graph and report
    #[must_use]
    pub fn into_parts(self) -> (InterchangeGraph, ConversionReport) {
        (self.graph, self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_model::ErrorKind;

    fn batch() -> ExportContext {
        ExportContext::new(
            [
                NativeObjectSpec::new("p1".into(), "point"),
                NativeObjectSpec::new("m1".into(), "member"),
            ],
            Some("ADM.".into()),
        )
    }

    #[test]
    fn converts_each_handle_once() {
        let mut ctx = batch();
        let mut calls = 0;
        let first = ctx
            .get_or_convert(&"p1".into(), None, |_, _| {
                calls += 1;
                Ok(InterchangeNode::new("Node"))
            })
            .unwrap();
        let second = ctx
            .get_or_convert(&"p1".into(), Some(&"Node".into()), |_, _| {
                unreachable!("cached")
            })
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(calls, 1);

        let node = ctx.graph().node(first).unwrap();
        assert_eq!(node.external_id(), Some(&ExternalId::new("ADM.p1")));
    }

    #[test]
    fn cached_type_mismatch_is_conflict() {
        let mut ctx = batch();
        ctx.get_or_convert(&"p1".into(), None, |_, _| Ok(InterchangeNode::new("Node")))
            .unwrap();
        let err = ctx
            .get_or_convert(&"p1".into(), Some(&"Element1D".into()), |_, _| {
                Ok(InterchangeNode::new("Element1D"))
            })
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[test]
    fn dependencies_convert_on_demand_and_cycles_fail() {
        let mut ctx = batch();
        let member = ctx
            .get_or_convert(&"m1".into(), None, |ctx, _| {
                let end = ctx.get_or_convert(&"p1".into(), None, |_, _| {
                    Ok(InterchangeNode::new("Node"))
                })?;
                Ok(InterchangeNode::new("Element1D").with_property("end1Node", end))
            })
            .unwrap();
        assert_eq!(ctx.exported().len(), 2);
        assert!(ctx.graph().node(member).unwrap().child("end1Node").is_some());

        let err = ctx
            .get_or_convert(&"missing".into(), None, |_, _| Ok(InterchangeNode::new("Node")))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);

        let mut ctx = ExportContext::new([NativeObjectSpec::new("a".into(), "point")], None);
        let err = ctx
            .get_or_convert(&"a".into(), None, |ctx, _| {
                ctx.get_or_convert(&"a".into(), None, |_, _| Ok(InterchangeNode::new("Node")))?;
                Ok(InterchangeNode::new("Node"))
            })
            .unwrap_err();
        assert_eq!(err.message, "cycle detected");
    }
}
