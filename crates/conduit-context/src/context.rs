//! Per-run conversion context
//!
//! One [`ConversionContext`] is created when a run leaves `Idle` and is
//! dropped when the run ends. It owns the identity registry, geometric
//! index, name registry, handle allocator and report for that run; nothing
//! here is shared between runs.

use crate::allocator::{AllocatorCheckpoint, HandleAllocator, HandleSource};
use crate::error::ContextError;
use crate::geometric::{GeometricCheckpoint, GeometricIndex, PointMatch, DEFAULT_TOLERANCE};
use crate::identity::IdentityRegistry;
use crate::naming::{NameCheckpoint, NameRegistry};
use crate::report::ConversionReport;
use conduit_model::{
    ConversionError, ConversionResult, ExternalId, NativeHandle, NativeRef, PlaceholderSet,
    Point3, VariantTag,
};
use serde::{Deserialize, Serialize};

/// Context settings resolved from the engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Coincidence tolerance in meters
    pub coincidence_tolerance: f64,
    /// Prefix for generated point names
    pub name_prefix: String,
    /// Prefix marking external ids that carry a native handle
    pub native_id_prefix: Option<String>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            coincidence_tolerance: DEFAULT_TOLERANCE,
            name_prefix: "N".to_string(),
            native_id_prefix: None,
        }
    }
}

/// Snapshot of every journaled structure, taken before converting a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    identity: usize,
    geometry: GeometricCheckpoint,
    names: NameCheckpoint,
    handles: AllocatorCheckpoint,
}

/// Point returned by [`ConversionContext::resolve_point`]
#[derive(Debug, Clone, PartialEq)]
pub struct PointResolution {
    pub handle: NativeHandle,
    pub name: String,
    /// False when an existing entity was reused or adopted
    pub created: bool,
}

/// Per-run state shared by the driver and the schema mapper
#[derive(Debug)]
pub struct ConversionContext {
    settings: ContextSettings,
    identity: IdentityRegistry,
    geometry: GeometricIndex,
    names: NameRegistry,
    handles: HandleAllocator,
    report: ConversionReport,
    current: Option<ExternalId>,
}

impl ConversionContext {
    /// Create a context for one run
    pub fn new(settings: ContextSettings, previous: &PlaceholderSet) -> Result<Self, ContextError> {
        let geometry = GeometricIndex::new(settings.coincidence_tolerance)?;
        let handles = HandleAllocator::new(previous, settings.native_id_prefix.clone());
        Ok(Self {
            settings,
            identity: IdentityRegistry::new(),
            geometry,
            names: NameRegistry::new(),
            handles,
            report: ConversionReport::new(),
            current: None,
        })
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.geometry.epsilon()
    }

    /// Override epsilon, e.g. from document-level settings
    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<(), ContextError> {
        self.geometry.set_epsilon(epsilon)?;
        self.settings.coincidence_tolerance = epsilon;
        Ok(())
    }

    // ----- per-node scope -----

    /// Enter a node conversion and take a checkpoint
    pub fn begin_node(&mut self, id: ExternalId) -> Checkpoint {
        self.current = Some(id);
        self.checkpoint()
    }

    /// Leave the node scope, keeping its mutations
    pub fn commit_node(&mut self) {
        self.current = None;
    }

    /// Leave the node scope, discarding its mutations
    pub fn rollback_node(&mut self, checkpoint: Checkpoint) {
        self.rollback(checkpoint);
        self.current = None;
    }

    /// External id of the node being converted
    #[inline]
    #[must_use]
    pub fn current_id(&self) -> Option<&ExternalId> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            identity: self.identity.checkpoint(),
            geometry: self.geometry.checkpoint(),
            names: self.names.checkpoint(),
            handles: self.handles.checkpoint(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.identity.rollback(checkpoint.identity);
        self.geometry.rollback(checkpoint.geometry);
        self.names.rollback(checkpoint.names);
        self.handles.rollback(checkpoint.handles);
    }

    // ----- identity -----

    /// Handles registered for `id` under `variant`
    #[must_use]
    pub fn lookup(&self, id: &ExternalId, variant: &VariantTag) -> Option<Vec<NativeHandle>> {
        self.identity.lookup(id, variant).map(<[_]>::to_vec)
    }

    pub fn register(
        &mut self,
        id: &ExternalId,
        objects: impl IntoIterator<Item = NativeRef>,
        exclusive: bool,
    ) -> ConversionResult<()> {
        self.identity
            .register(id, objects, exclusive)
            .map_err(ConversionError::from)
    }

    #[inline]
    #[must_use]
    pub fn identity(&self) -> &IdentityRegistry {
        &self.identity
    }

    // ----- handles -----

    /// Allocate the next handle for the node being converted
    pub fn allocate_handle(&mut self) -> ConversionResult<NativeHandle> {
        let id = self.current.clone().ok_or(ContextError::NoCurrentNode)?;
        let (handle, source) = self.handles.allocate(&id);
        tracing::trace!(id = %id, handle = %handle, ?source, "allocated handle");
        Ok(handle)
    }

    /// Number of handles reused from the previous run
    #[must_use]
    pub fn reused_handles(&self) -> usize {
        self.handles.count(HandleSource::Previous)
    }

    // ----- geometry -----

    /// Find or place a point-like entity of the given variant
    ///
    /// Keyed lookups that land on a pre-existing native point outside
    /// tolerance adopt that point and move it; within the current run such
    /// a mismatch is a conflict.
    pub fn resolve_point(
        &mut self,
        location: Point3,
        key: Option<&str>,
        variant: &VariantTag,
    ) -> ConversionResult<PointResolution> {
        let cause = self.current.clone();
        let found = self
            .geometry
            .find(location, key)
            .map_err(|e| ConversionError::from(e).with_cause(cause.clone()))?;
        match found {
            PointMatch::Found(entry) => Ok(PointResolution {
                handle: entry.handle,
                name: entry.name,
                created: false,
            }),
            PointMatch::Displaced { entry, distance } => {
                let key = key.unwrap_or_default();
                self.geometry.relocate(key, location);
                self.report.log_info(format!(
                    "adopted existing {variant} '{}' and moved it by {distance} m",
                    entry.name
                ));
                Ok(PointResolution {
                    handle: entry.handle,
                    name: entry.name,
                    created: false,
                })
            }
            PointMatch::Missing => {
                let name = match key {
                    Some(key) => {
                        if !self.names.reserve(variant.as_str(), key) {
                            let err = ContextError::NameTaken {
                                name: key.to_string(),
                                variant: variant.clone(),
                            };
                            return Err(ConversionError::from(err).with_cause(cause));
                        }
                        key.to_string()
                    }
                    None => {
                        let prefix = self.settings.name_prefix.clone();
                        self.names.next_unique(variant.as_str(), &prefix)
                    }
                };
                let handle = self.allocate_handle()?;
                self.geometry
                    .insert(location, handle.clone(), key.map(str::to_string), name.clone())
                    .map_err(|e| ConversionError::from(e).with_cause(cause))?;
                Ok(PointResolution {
                    handle,
                    name,
                    created: true,
                })
            }
        }
    }

    /// Register a point that already exists in the native document
    pub fn seed_point(
        &mut self,
        location: Point3,
        handle: NativeHandle,
        name: &str,
        variant: &VariantTag,
    ) -> Result<(), ContextError> {
        self.names.reserve(variant.as_str(), name);
        self.geometry
            .seed(location, handle, Some(name.to_string()), name.to_string())
    }

    /// Handles of every indexed point within epsilon of a polyline
    #[must_use]
    pub fn points_on_polyline(&self, polyline: &[Point3]) -> Vec<NativeHandle> {
        self.geometry.points_on_polyline(polyline)
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &GeometricIndex {
        &self.geometry
    }

    // ----- report -----

    #[inline]
    #[must_use]
    pub fn report(&self) -> &ConversionReport {
        &self.report
    }

    #[inline]
    pub fn report_mut(&mut self) -> &mut ConversionReport {
        &mut self.report
    }

    /// Finish the run, keeping only the report
    #[must_use]
    pub fn into_report(self) -> ConversionReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_model::{ErrorKind, Placeholder, PlaceholderStatus};

    fn context() -> ConversionContext {
        let settings = ContextSettings {
            coincidence_tolerance: 1e-3,
            ..ContextSettings::default()
        };
        ConversionContext::new(settings, &PlaceholderSet::new()).unwrap()
    }

    #[test]
    fn allocation_requires_a_current_node() {
        let mut ctx = context();
        let err = ctx.allocate_handle().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Fatal);
    }

    #[test]
    fn unkeyed_points_are_named_and_deduplicated() {
        let mut ctx = context();
        let point: VariantTag = "point".into();
        ctx.begin_node("m1".into());
        let a = ctx.resolve_point(Point3::ORIGIN, None, &point).unwrap();
        let b = ctx
            .resolve_point(Point3::new(0.0002, 0.0, 0.0), None, &point)
            .unwrap();
        let c = ctx
            .resolve_point(Point3::new(1.0, 0.0, 0.0), None, &point)
            .unwrap();
        ctx.commit_node();

        assert!(a.created && !b.created && c.created);
        assert_eq!(a.handle, b.handle);
        assert_eq!((a.name.as_str(), c.name.as_str()), ("N1", "N2"));
    }

    #[test]
    fn keyed_mismatch_within_run_is_conflict_with_cause() {
        let mut ctx = context();
        let point: VariantTag = "point".into();
        ctx.begin_node("a1".into());
        ctx.resolve_point(Point3::ORIGIN, Some("A"), &point).unwrap();
        let err = ctx
            .resolve_point(Point3::new(5.0, 0.0, 0.0), Some("A"), &point)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.cause, Some(ExternalId::new("a1")));
    }

    #[test]
    fn keyed_mismatch_on_existing_point_adopts_it() {
        let mut ctx = context();
        let point: VariantTag = "point".into();
        ctx.seed_point(Point3::ORIGIN, "native-7".into(), "A", &point)
            .unwrap();
        ctx.begin_node("a1".into());
        let adopted = ctx
            .resolve_point(Point3::new(5.0, 0.0, 0.0), Some("A"), &point)
            .unwrap();
        assert_eq!(adopted.handle, NativeHandle::new("native-7"));
        assert!(!adopted.created);
        assert!(ctx.report().full_log()[0].message.starts_with("adopted existing point 'A'"));
    }

    #[test]
    fn failed_node_rollback_discards_context_mutations() {
        let previous: PlaceholderSet = vec![Placeholder::new(
            "m1",
            vec![NativeHandle::new("h-old")],
            PlaceholderStatus::Created,
        )]
        .into();
        let mut ctx = ConversionContext::new(ContextSettings::default(), &previous).unwrap();
        let point: VariantTag = "point".into();

        let cp = ctx.begin_node("m1".into());
        let placed = ctx.resolve_point(Point3::ORIGIN, None, &point).unwrap();
        ctx.register(&"m1".into(), [NativeRef::new(placed.handle.clone(), "point")], false)
            .unwrap();
        assert_eq!(placed.handle, NativeHandle::new("h-old"));
        ctx.rollback_node(cp);

        assert!(ctx.geometry().is_empty());
        assert!(!ctx.identity().contains(&"m1".into()));

        ctx.begin_node("m1".into());
        let again = ctx.resolve_point(Point3::ORIGIN, None, &point).unwrap();
        assert_eq!(again.handle, NativeHandle::new("h-old"));
        assert_eq!(again.name, "N1");
    }
}
