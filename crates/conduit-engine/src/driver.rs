//! Synchronization driver
//!
//! Runs one synchronization: walk, schedule, convert, reconcile, apply.
//! Per-node conversion errors are rolled back, recorded and skipped; only
//! fatal errors abort the run. Cancellation is honoured at phase
//! boundaries.

use crate::adapter::NativeAdapter;
use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::{AdapterError, SyncError, SyncFailure};
use crate::mapper::SchemaMapper;
use crate::reconcile::{reconcile, DeleteInstruction};
use crate::scheduler;
use crate::state_machine::{PhaseTracker, SyncPhase};
use crate::store::PlaceholderStore;
use crate::summary::{ApplyStats, ExportOutcome, SyncOutcome, SyncSummary};
use crate::walker;
use conduit_context::{ConversionContext, ConversionReport, ExportContext};
use conduit_model::json::{COLLECTION_TYPE, ELEMENTS_PROPERTY};
use conduit_model::{
    ConversionError, ErrorKind, ExternalId, InterchangeGraph, InterchangeNode, NativeHandle,
    NativeObjectSpec, NodeId, Placeholder, PlaceholderSet, PlaceholderStatus, TypeTag, Value,
};
use indexmap::{IndexMap, IndexSet};

/// Prefix of ids assigned to nodes that carry no external id
pub const SYNTHETIC_ID_PREFIX: &str = "anon:";

/// Specs produced for one external id, in production order
#[derive(Debug, Clone)]
struct PlannedNode {
    id: ExternalId,
    specs: Vec<NativeObjectSpec>,
}

/// Synchronization driver
#[derive(Debug, Clone, Default)]
pub struct SyncDriver {
    config: EngineConfig,
    cancel: CancelToken,
}

impl SyncDriver {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load the previous state, run, and save the new state if the run is
    /// `Done`
    pub fn run_with_store<M, A, S>(
        &self,
        graph: &InterchangeGraph,
        store: &mut S,
        mapper: &M,
        adapter: &mut A,
    ) -> Result<SyncOutcome, SyncFailure>
    where
        M: SchemaMapper + ?Sized,
        A: NativeAdapter + ?Sized,
        S: PlaceholderStore + ?Sized,
    {
        let previous = store
            .load()
            .map_err(|e| SyncFailure::new(SyncPhase::Idle, e, ConversionReport::new()))?;
        let outcome = self.run(graph, &previous, mapper, adapter)?;
        if outcome.is_done() {
            store
                .save(&outcome.persisted)
                .map_err(|e| SyncFailure::new(SyncPhase::Done, e, outcome.report.clone()))?;
        }
        Ok(outcome)
    }

    /// Synchronize `graph` into the native model
    ///
    /// `Ok` for runs that end `Done` or `Cancelled`; `Err` for runs that end
    /// `Failed`.
    pub fn run<M, A>(
        &self,
        graph: &InterchangeGraph,
        previous: &PlaceholderSet,
        mapper: &M,
        adapter: &mut A,
    ) -> Result<SyncOutcome, SyncFailure>
    where
        M: SchemaMapper + ?Sized,
        A: NativeAdapter + ?Sized,
    {
        let mut tracker = PhaseTracker::new();

        // ----- Idle -----
        if let Err(e) = adapter.check_available() {
            return Err(abort(&mut tracker, e, ConversionReport::new()));
        }
        let Some((root, root_node)) = graph
            .root()
            .and_then(|id| graph.node(id).map(|node| (id, node)))
        else {
            let err = ConversionError::fatal("no context document");
            return Err(abort(&mut tracker, SyncError::Conversion(err), ConversionReport::new()));
        };
        let mut ctx = match ConversionContext::new(self.config.context_settings(), previous) {
            Ok(ctx) => ctx,
            Err(e) => return Err(abort(&mut tracker, e, ConversionReport::new())),
        };

        // ----- Walking -----
        step(&mut tracker, SyncPhase::Walking, &ctx)?;
        match self.config.document_tolerance(root_node) {
            Ok(Some(eps)) => {
                if let Err(e) = ctx.set_epsilon(eps) {
                    ctx.report_mut().record(&ConversionError::from(e));
                } else {
                    ctx.report_mut()
                        .log_info(format!("coincidence tolerance set to {eps} m by document"));
                }
            }
            Ok(None) => {}
            Err(e) => ctx.report_mut().record(&e),
        }
        let existing = match adapter.existing_points() {
            Ok(points) => points,
            Err(e) => return Err(abort(&mut tracker, e, ctx.into_report())),
        };
        for point in existing {
            if let Err(e) = ctx.seed_point(point.location, point.handle, &point.name, &point.variant) {
                ctx.report_mut().record(&ConversionError::from(e));
            }
        }
        let flat = walker::flatten(graph, root, |node| mapper.can_convert_to_native(node));
        for err in &flat.errors {
            ctx.report_mut().record(err);
        }
        tracing::info!("flattened {} convertible nodes", flat.nodes.len());
        if self.cancel.is_cancelled() {
            return cancelled(tracker, ctx, PlaceholderSet::new(), previous);
        }

        // ----- Scheduling -----
        step(&mut tracker, SyncPhase::Scheduling, &ctx)?;
        let mut scheduled = flat.nodes;
        scheduler::schedule(graph, &mut scheduled, mapper);
        // one type shares one priority, so per-type flatten order survives
        let pending = assign_ids(graph, scheduled);
        if self.cancel.is_cancelled() {
            return cancelled(tracker, ctx, PlaceholderSet::new(), previous);
        }

        // ----- Converting -----
        step(&mut tracker, SyncPhase::Converting, &ctx)?;
        let mut placeholders = PlaceholderSet::new();
        let mut planned: Vec<PlannedNode> = Vec::new();
        let mut borrowed: IndexSet<ExternalId> = IndexSet::new();
        for (node_id, external_id) in pending {
            if placeholders.contains(&external_id) {
                ctx.report_mut()
                    .log_info(format!("{external_id} appears more than once; converted once"));
                continue;
            }
            if ctx.identity().contains(&external_id) {
                // converted on demand while another node was converting
                let handles: IndexSet<NativeHandle> = ctx
                    .identity()
                    .objects(&external_id)
                    .into_iter()
                    .map(|object| object.handle)
                    .collect();
                tracing::debug!("{} was already converted by a dependent node", external_id);
                placeholders.insert(Placeholder::new(
                    external_id.clone(),
                    handles.into_iter().collect(),
                    PlaceholderStatus::Created,
                ));
                borrowed.insert(external_id);
                continue;
            }
            let Some(view) = graph.view(node_id) else {
                continue;
            };

            let checkpoint = ctx.begin_node(external_id.clone());
            let result = mapper
                .convert_to_native(view, &mut ctx)
                .and_then(|specs| {
                    ctx.register(&external_id, specs.iter().map(NativeObjectSpec::native_ref), false)?;
                    Ok(specs)
                });

            match result {
                Ok(specs) if specs.is_empty() => {
                    ctx.commit_node();
                    tracing::debug!("{} produced no native objects", external_id);
                    placeholders.insert(Placeholder::new(
                        external_id,
                        Vec::new(),
                        PlaceholderStatus::Skipped,
                    ));
                }
                Ok(specs) => {
                    ctx.commit_node();
                    tracing::debug!("converted {} into {} objects", external_id, specs.len());
                    let handles = unique_handles(&specs);
                    placeholders.insert(Placeholder::new(
                        external_id.clone(),
                        handles,
                        PlaceholderStatus::Created,
                    ));
                    planned.push(PlannedNode {
                        id: external_id,
                        specs,
                    });
                }
                Err(err) => {
                    ctx.rollback_node(checkpoint);
                    let err = err.with_cause(Some(external_id.clone()));
                    ctx.report_mut().record(&err);
                    if err.kind.aborts_run() {
                        return Err(abort(&mut tracker, SyncError::Conversion(err), ctx.into_report()));
                    }
                    let status = if err.kind == ErrorKind::Skipped {
                        PlaceholderStatus::Skipped
                    } else {
                        PlaceholderStatus::Failed
                    };
                    let handles = if self.config.preserve_failed && status == PlaceholderStatus::Failed {
                        previous.handles(&external_id).to_vec()
                    } else {
                        Vec::new()
                    };
                    placeholders.insert(Placeholder::new(external_id, handles, status));
                }
            }
        }

        if self.config.snap_internal_points {
            for spec in planned.iter_mut().flat_map(|node| node.specs.iter_mut()) {
                if let Some(axis) = &spec.axis {
                    let on_axis = ctx.points_on_polyline(axis);
                    spec.attach_internal_points(on_axis);
                }
            }
        }
        if self.cancel.is_cancelled() {
            return cancelled(tracker, ctx, placeholders, previous);
        }

        // ----- Reconciling -----
        step(&mut tracker, SyncPhase::Reconciling, &ctx)?;
        let current: PlaceholderSet = placeholders
            .iter()
            .filter(|p| self.keeps(p))
            .cloned()
            .collect();
        let deletes = reconcile(previous, &current);
        tracing::info!("{} delete instructions", deletes.len());
        if self.cancel.is_cancelled() {
            return cancelled(tracker, ctx, placeholders, previous);
        }

        // ----- Applying -----
        step(&mut tracker, SyncPhase::Applying, &ctx)?;
        if let Err(e) = adapter.begin(&self.config.transaction_label) {
            return Err(abort(&mut tracker, e, ctx.into_report()));
        }
        let stats = match apply(
            adapter,
            &deletes,
            &mut planned,
            &borrowed,
            &mut placeholders,
            ctx.report_mut(),
        ) {
            Ok(stats) => stats,
            Err(e) => {
                adapter.rollback();
                return Err(abort(&mut tracker, e, ctx.into_report()));
            }
        };

        // ----- Done -----
        step(&mut tracker, SyncPhase::Done, &ctx)?;
        let mut applied: IndexSet<ExternalId> = planned.into_iter().map(|node| node.id).collect();
        applied.extend(borrowed);
        let persisted: PlaceholderSet = placeholders
            .iter()
            .filter(|p| {
                self.keeps(p)
                    || (p.status == PlaceholderStatus::Failed
                        && applied.contains(&p.external_id)
                        && !p.native_handles.is_empty())
            })
            .cloned()
            .collect();

        let reused = ctx.reused_handles();
        let report = ctx.into_report();
        let summary = SyncSummary::new(SyncPhase::Done, &placeholders, reused, stats, &report);
        tracing::info!(
            "synchronization done: {} created, {} updated, {} deleted",
            stats.created,
            stats.updated,
            stats.deleted
        );
        Ok(SyncOutcome {
            status: SyncPhase::Done,
            phases: tracker.history().to_vec(),
            placeholders,
            persisted,
            deletes,
            report,
            summary,
        })
    }

    /// Convert native objects into an interchange graph
    ///
    /// The root container lists every exported node in conversion order.
    /// Per-object errors are reported and the batch continues.
    pub fn export<M>(
        &self,
        objects: impl IntoIterator<Item = NativeObjectSpec>,
        mapper: &M,
    ) -> ExportOutcome
    where
        M: SchemaMapper + ?Sized,
    {
        let mut ctx = ExportContext::new(objects, self.config.native_id_prefix.clone());
        for handle in ctx.source_handles() {
            let Some(object) = ctx.source(&handle).cloned() else {
                continue;
            };
            let cause = ctx.external_id_for(&handle);
            if !mapper.can_convert_to_interchange(&object) {
                ctx.report_mut().log_error(
                    ErrorKind::Skipped,
                    format!("export of {} is not supported", object.variant),
                    Some(cause),
                );
                continue;
            }
            let result = ctx.get_or_convert(&handle, None, |ctx, object| {
                mapper.convert_to_interchange(object, ctx)
            });
            if let Err(err) = result {
                ctx.report_mut()
                    .record(&err.context(&object.variant).with_cause(Some(cause)));
            }
        }

        let exported = ctx.exported();
        let (mut graph, report) = ctx.into_parts();
        let elements: Vec<Value> = exported.iter().copied().map(Value::Node).collect();
        graph.add_root(InterchangeNode::new(COLLECTION_TYPE).with_property(ELEMENTS_PROPERTY, elements));
        tracing::info!("exported {} objects", exported.len());
        ExportOutcome {
            graph,
            exported: exported.len(),
            report,
        }
    }

    /// Whether a placeholder belongs to the current state
    fn keeps(&self, placeholder: &Placeholder) -> bool {
        placeholder.status.survived()
            || (self.config.preserve_failed
                && placeholder.status == PlaceholderStatus::Failed
                && !placeholder.native_handles.is_empty())
    }
}

/// Assign deterministic synthetic ids to nodes without an external id
///
/// `anon:{type}:{n}`, counted per type in flatten order, so the same
/// document yields the same ids on every run.
fn assign_ids(graph: &InterchangeGraph, nodes: Vec<NodeId>) -> Vec<(NodeId, ExternalId)> {
    let mut counters: IndexMap<TypeTag, usize> = IndexMap::new();
    nodes
        .into_iter()
        .filter_map(|id| {
            let node = graph.node(id)?;
            let external_id = match node.external_id() {
                Some(external_id) => external_id.clone(),
                None => {
                    let counter = counters.entry(node.type_tag().clone()).or_insert(0);
                    *counter += 1;
                    ExternalId::new(format!(
                        "{SYNTHETIC_ID_PREFIX}{}:{counter}",
                        node.type_tag()
                    ))
                }
            };
            Some((id, external_id))
        })
        .collect()
}

fn unique_handles(specs: &[NativeObjectSpec]) -> Vec<NativeHandle> {
    specs
        .iter()
        .map(|s| s.handle.clone())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Hand deletes, creates and updates to the adapter inside the open
/// transaction, then commit
fn apply<A>(
    adapter: &mut A,
    deletes: &[DeleteInstruction],
    planned: &mut [PlannedNode],
    borrowed: &IndexSet<ExternalId>,
    placeholders: &mut PlaceholderSet,
    report: &mut ConversionReport,
) -> Result<ApplyStats, SyncError>
where
    A: NativeAdapter + ?Sized,
{
    let mut stats = ApplyStats::default();

    for delete in deletes {
        if !adapter.resolve(&delete.handle)? {
            stats.missing_deletes += 1;
            tracing::debug!("{} already gone, skipping delete", delete.handle);
            continue;
        }
        match adapter.delete(&delete.handle) {
            Ok(()) => stats.deleted += 1,
            Err(e) if e.is_per_object() => {
                stats.rejected += 1;
                report.log_error(ErrorKind::Conflict, e.to_string(), Some(delete.external_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut remap: IndexMap<NativeHandle, NativeHandle> = IndexMap::new();
    let mut outcomes: IndexMap<NativeHandle, HandleOutcome> = IndexMap::new();
    for node in planned.iter_mut() {
        let mut live: IndexSet<NativeHandle> = IndexSet::new();
        let mut any_created = false;
        let mut rejected = false;

        for spec in &mut node.specs {
            remap_spec(spec, &remap);
            if adapter.resolve(&spec.handle)? {
                match adapter.update(&spec.handle, spec) {
                    Ok(()) => {
                        stats.updated += 1;
                        outcomes.insert(spec.handle.clone(), HandleOutcome::Updated);
                    }
                    Err(e) => {
                        reject(e, &node.id, &mut stats, report)?;
                        rejected = true;
                        outcomes.insert(spec.handle.clone(), HandleOutcome::RejectedUpdate);
                    }
                }
                live.insert(spec.handle.clone());
            } else {
                match adapter.create(spec) {
                    Ok(handle) => {
                        stats.created += 1;
                        any_created = true;
                        if handle != spec.handle {
                            stats.remapped += 1;
                            remap.insert(spec.handle.clone(), handle.clone());
                            spec.handle = handle.clone();
                        }
                        outcomes.insert(handle.clone(), HandleOutcome::Created);
                        live.insert(handle);
                    }
                    Err(e) => {
                        reject(e, &node.id, &mut stats, report)?;
                        rejected = true;
                        outcomes.insert(spec.handle.clone(), HandleOutcome::RejectedCreate);
                    }
                }
            }
        }

        if let Some(placeholder) = placeholders.get_mut(&node.id) {
            placeholder.native_handles = live.into_iter().collect();
            placeholder.status = if rejected {
                PlaceholderStatus::Failed
            } else if any_created {
                PlaceholderStatus::Created
            } else {
                PlaceholderStatus::Updated
            };
        }
    }

    for id in borrowed {
        if let Some(placeholder) = placeholders.get_mut(id) {
            settle_borrowed(placeholder, &remap, &outcomes);
        }
    }

    adapter.commit()?;
    Ok(stats)
}

/// What happened to one handle during apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleOutcome {
    Created,
    Updated,
    /// Still exists natively
    RejectedUpdate,
    RejectedCreate,
}

/// Bring a placeholder whose objects were produced by another node in line
/// with what the adapter did to those objects
fn settle_borrowed(
    placeholder: &mut Placeholder,
    remap: &IndexMap<NativeHandle, NativeHandle>,
    outcomes: &IndexMap<NativeHandle, HandleOutcome>,
) {
    let mut live: IndexSet<NativeHandle> = IndexSet::new();
    let mut any_created = false;
    let mut rejected = false;
    for handle in &placeholder.native_handles {
        let handle = remap.get(handle).unwrap_or(handle);
        match outcomes.get(handle) {
            Some(HandleOutcome::RejectedCreate) => rejected = true,
            Some(HandleOutcome::RejectedUpdate) => {
                rejected = true;
                live.insert(handle.clone());
            }
            Some(HandleOutcome::Created) => {
                any_created = true;
                live.insert(handle.clone());
            }
            Some(HandleOutcome::Updated) | None => {
                live.insert(handle.clone());
            }
        }
    }
    placeholder.native_handles = live.into_iter().collect();
    placeholder.status = if rejected {
        PlaceholderStatus::Failed
    } else if any_created {
        PlaceholderStatus::Created
    } else {
        PlaceholderStatus::Updated
    };
}

/// Record a per-object rejection, or escalate any other adapter error
fn reject(
    error: AdapterError,
    id: &ExternalId,
    stats: &mut ApplyStats,
    report: &mut ConversionReport,
) -> Result<(), SyncError> {
    if !error.is_per_object() {
        return Err(error.into());
    }
    stats.rejected += 1;
    report.log_error(ErrorKind::InvalidInput, error.to_string(), Some(id.clone()));
    Ok(())
}

fn remap_spec(spec: &mut NativeObjectSpec, remap: &IndexMap<NativeHandle, NativeHandle>) {
    if remap.is_empty() {
        return;
    }
    let swap = |handle: &mut NativeHandle| {
        if let Some(new) = remap.get(handle) {
            *handle = new.clone();
        }
    };
    swap(&mut spec.handle);
    spec.anchors.iter_mut().for_each(swap);
    spec.internal_points.iter_mut().for_each(swap);
}

fn step(
    tracker: &mut PhaseTracker,
    to: SyncPhase,
    ctx: &ConversionContext,
) -> Result<(), SyncFailure> {
    tracker
        .advance(to)
        .map_err(|e| SyncFailure::new(tracker.current(), e, ctx.report().clone()))
}

fn abort(
    tracker: &mut PhaseTracker,
    error: impl Into<SyncError>,
    mut report: ConversionReport,
) -> SyncFailure {
    let error = error.into();
    let phase = tracker.current();
    if !matches!(error, SyncError::Conversion(_)) {
        report.log_error(ErrorKind::Fatal, error.to_string(), None);
    }
    if let Err(e) = tracker.advance(SyncPhase::Failed) {
        tracing::error!("cannot mark run failed: {}", e);
    }
    SyncFailure::new(phase, error, report)
}

fn cancelled(
    mut tracker: PhaseTracker,
    ctx: ConversionContext,
    placeholders: PlaceholderSet,
    previous: &PlaceholderSet,
) -> Result<SyncOutcome, SyncFailure> {
    step(&mut tracker, SyncPhase::Cancelled, &ctx)?;
    let reused = ctx.reused_handles();
    let report = ctx.into_report();
    let summary = SyncSummary::new(
        SyncPhase::Cancelled,
        &placeholders,
        reused,
        ApplyStats::default(),
        &report,
    );
    Ok(SyncOutcome {
        status: SyncPhase::Cancelled,
        phases: tracker.history().to_vec(),
        placeholders,
        persisted: previous.clone(),
        deletes: Vec::new(),
        report,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_ids_count_per_type_in_order() {
        let mut graph = InterchangeGraph::new();
        let a = graph.add(InterchangeNode::new("Node"));
        let b = graph.add(InterchangeNode::new("Node").with_external_id("b1"));
        let c = graph.add(InterchangeNode::new("Element1D"));
        let d = graph.add(InterchangeNode::new("Node"));

        let ids: Vec<String> = assign_ids(&graph, vec![a, b, c, d])
            .into_iter()
            .map(|(_, id)| id.to_string())
            .collect();
        assert_eq!(ids, vec!["anon:Node:1", "b1", "anon:Element1D:1", "anon:Node:2"]);
    }

    #[test]
    fn borrowed_placeholder_follows_remapped_handles() {
        let mut remap = IndexMap::new();
        remap.insert(NativeHandle::new("h1"), NativeHandle::new("native-1"));
        let mut outcomes = IndexMap::new();
        outcomes.insert(NativeHandle::new("native-1"), HandleOutcome::Created);
        outcomes.insert(NativeHandle::new("h2"), HandleOutcome::RejectedCreate);

        let mut placeholder =
            Placeholder::new("a1", vec!["h1".into()], PlaceholderStatus::Created);
        settle_borrowed(&mut placeholder, &remap, &outcomes);
        assert_eq!(placeholder.native_handles, vec![NativeHandle::new("native-1")]);
        assert_eq!(placeholder.status, PlaceholderStatus::Created);

        let mut rejected =
            Placeholder::new("b1", vec!["h2".into()], PlaceholderStatus::Created);
        settle_borrowed(&mut rejected, &remap, &outcomes);
        assert!(rejected.native_handles.is_empty());
        assert_eq!(rejected.status, PlaceholderStatus::Failed);
    }

    #[test]
    fn remap_rewrites_every_reference() {
        let mut remap = IndexMap::new();
        remap.insert(NativeHandle::new("old"), NativeHandle::new("new"));
        let mut spec = NativeObjectSpec::new("old".into(), "member");
        spec.anchors.push("old".into());
        spec.internal_points.push("other".into());
        remap_spec(&mut spec, &remap);
        assert_eq!(spec.handle, NativeHandle::new("new"));
        assert_eq!(spec.anchors, vec![NativeHandle::new("new")]);
        assert_eq!(spec.internal_points, vec![NativeHandle::new("other")]);
    }
}
