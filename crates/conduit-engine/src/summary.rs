//! Run outcome and summary

use crate::reconcile::DeleteInstruction;
use crate::state_machine::SyncPhase;
use conduit_context::{ConversionReport, Severity};
use conduit_model::{InterchangeGraph, PlaceholderSet, PlaceholderStatus};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the adapter did during `Applying`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Deletes skipped because the object no longer resolved
    pub missing_deletes: usize,
    /// Objects the native model refused
    pub rejected: usize,
    /// Creates that came back with a different handle
    pub remapped: usize,
}

/// Counts and distinct errors of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub status: Option<SyncPhase>,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub reused_handles: usize,
    pub apply: ApplyStats,
    pub severity_counts: IndexMap<Severity, usize>,
    pub distinct_errors: Vec<String>,
}

impl SyncSummary {
    #[must_use]
    pub fn new(
        status: SyncPhase,
        placeholders: &PlaceholderSet,
        reused_handles: usize,
        apply: ApplyStats,
        report: &ConversionReport,
    ) -> Self {
        Self {
            status: Some(status),
            converted: placeholders.count(PlaceholderStatus::Created)
                + placeholders.count(PlaceholderStatus::Updated),
            skipped: placeholders.count(PlaceholderStatus::Skipped),
            failed: placeholders.count(PlaceholderStatus::Failed),
            reused_handles,
            apply,
            severity_counts: report.counts(),
            distinct_errors: report.distinct_errors(),
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            writeln!(f, "status: {status}")?;
        }
        writeln!(
            f,
            "converted: {}, skipped: {}, failed: {}",
            self.converted, self.skipped, self.failed
        )?;
        writeln!(
            f,
            "created: {}, updated: {}, deleted: {}, reused handles: {}",
            self.apply.created, self.apply.updated, self.apply.deleted, self.reused_handles
        )?;
        for (severity, count) in &self.severity_counts {
            writeln!(f, "  {severity}: {count}")?;
        }
        for message in &self.distinct_errors {
            writeln!(f, "  - {message}")?;
        }
        Ok(())
    }
}

/// Result of a run that reached `Done` or `Cancelled`
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub status: SyncPhase,
    /// Every phase visited, starting at `Idle`
    pub phases: Vec<SyncPhase>,
    /// Placeholder of every converted id, including skipped and failed ones
    pub placeholders: PlaceholderSet,
    /// The set to persist as next run's previous state
    pub persisted: PlaceholderSet,
    pub deletes: Vec<DeleteInstruction>,
    pub report: ConversionReport,
    pub summary: SyncSummary,
}

impl SyncOutcome {
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == SyncPhase::Done
    }
}

/// Result of an export
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// Exported nodes under a root container
    pub graph: InterchangeGraph,
    pub exported: usize,
    pub report: ConversionReport,
}
