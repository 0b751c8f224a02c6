//! Conversion report
//!
//! Append-only log of informational and error events for one run. Every
//! append is mirrored to a `tracing` event.

use conduit_model::{ConversionError, ErrorKind, ExternalId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a report entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Skipped,
    InvalidInput,
    Conflict,
    Fatal,
}

impl Severity {
    #[inline]
    #[must_use]
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Info)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Skipped => ErrorKind::Skipped.label(),
            Self::InvalidInput => ErrorKind::InvalidInput.label(),
            Self::Conflict => ErrorKind::Conflict.label(),
            Self::Fatal => ErrorKind::Fatal.label(),
        }
    }
}

impl From<ErrorKind> for Severity {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Skipped => Self::Skipped,
            ErrorKind::InvalidInput => Self::InvalidInput,
            ErrorKind::Conflict => Self::Conflict,
            ErrorKind::Fatal => Self::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `{ severity, message, causeObjectId? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<ExternalId>,
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

/// Ordered event accumulator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionReport {
    entries: Vec<ReportEntry>,
}

impl ConversionReport {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "conduit::report", "{message}");
        self.entries.push(ReportEntry {
            severity: Severity::Info,
            message,
            cause: None,
        });
    }

    pub fn log_error(
        &mut self,
        severity: impl Into<Severity>,
        message: impl Into<String>,
        cause: Option<ExternalId>,
    ) {
        let severity = severity.into();
        let message = message.into();
        let cause_id = cause.as_ref().map_or("", ExternalId::as_str);
        match severity {
            Severity::Info => tracing::info!(target: "conduit::report", cause = cause_id, "{message}"),
            Severity::Fatal => tracing::error!(target: "conduit::report", cause = cause_id, "{message}"),
            _ => tracing::warn!(
                target: "conduit::report",
                severity = severity.label(),
                cause = cause_id,
                "{message}"
            ),
        }
        self.entries.push(ReportEntry {
            severity,
            message,
            cause,
        });
    }

    /// Record a classified conversion error
    pub fn record(&mut self, error: &ConversionError) {
        self.log_error(error.kind, error.message.clone(), error.cause.clone());
    }

    /// Distinct error messages, first occurrence order
    #[must_use]
    pub fn distinct_errors(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.severity.is_error())
            .map(|e| e.message.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every entry in append order
    #[inline]
    #[must_use]
    pub fn full_log(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Entries per severity, ascending severity
    #[must_use]
    pub fn counts(&self) -> IndexMap<Severity, usize> {
        let mut counts: IndexMap<Severity, usize> = IndexMap::new();
        for entry in &self.entries {
            *counts.entry(entry.severity).or_insert(0) += 1;
        }
        counts.sort_keys();
        counts
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity.is_error())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append another report's entries without re-emitting them
    pub fn extend(&mut self, other: ConversionReport) {
        self.entries.extend(other.entries);
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn distinct_errors_keep_first_occurrence_order() {
        let mut report = ConversionReport::new();
        report.log_info("starting");
        report.log_error(ErrorKind::InvalidInput, "missing end1Node", Some("m1".into()));
        report.log_error(ErrorKind::Conflict, "cycle detected", None);
        report.log_error(ErrorKind::InvalidInput, "missing end1Node", Some("m2".into()));

        assert_eq!(
            report.distinct_errors(),
            vec!["missing end1Node".to_string(), "cycle detected".to_string()]
        );
        assert_eq!(report.full_log().len(), 4);
    }

    #[test]
    fn counts_per_severity() {
        let mut report = ConversionReport::new();
        report.log_error(ErrorKind::Conflict, "a", None);
        report.log_info("b");
        report.record(&ConversionError::skipped("c"));
        report.log_error(ErrorKind::Conflict, "d", None);

        let counts: Vec<_> = report.counts().into_iter().collect();
        assert_eq!(
            counts,
            vec![
                (Severity::Info, 1),
                (Severity::Skipped, 1),
                (Severity::Conflict, 2)
            ]
        );
        assert!(report.has_errors());
    }

    #[test]
    fn display_includes_cause() {
        let mut report = ConversionReport::new();
        report.log_error(ErrorKind::Skipped, "unsupported type Text", Some("t1".into()));
        assert_eq!(report.to_string(), "[skipped] unsupported type Text (t1)\n");
    }
}
