//! Error types for the synchronization engine
//!
//! Per-node conversion failures never reach these types; they are recorded
//! in the run's report. Everything here either aborts a run or comes from
//! the surrounding plumbing (store, config).

use crate::state_machine::SyncPhase;
use conduit_context::{ContextError, ConversionReport};
use conduit_model::{ConversionError, NativeHandle};
use std::path::PathBuf;

/// Native adapter errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    /// Native application not reachable
    #[error("native adapter unavailable: {0}")]
    Unavailable(String),

    /// No document open in the native application
    #[error("no context document")]
    NoDocument,

    /// Transaction could not be opened, committed or rolled back
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// The native model refused one object
    #[error("{handle} rejected: {reason}")]
    Rejected { handle: NativeHandle, reason: String },
}

impl AdapterError {
    /// Whether only the one object is affected
    #[inline]
    #[must_use]
    pub fn is_per_object(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Placeholder store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("placeholder store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("placeholder state is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Illegal phase transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition { from: SyncPhase, to: SyncPhase },
}

/// Run-aborting errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// Fatal-classified conversion error
    #[error("conversion aborted: {0}")]
    Conversion(ConversionError),
}

impl SyncError {
    /// Whether the run must stop
    ///
    /// Per-object adapter rejections are the only non-fatal variant.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Adapter(e) if e.is_per_object())
    }
}

/// A run that ended in `Failed`, with whatever was reported before the abort
#[derive(Debug, thiserror::Error)]
#[error("synchronization failed during {phase}: {source}")]
pub struct SyncFailure {
    pub phase: SyncPhase,
    #[source]
    pub source: SyncError,
    pub report: ConversionReport,
}

impl SyncFailure {
    #[must_use]
    pub fn new(phase: SyncPhase, source: impl Into<SyncError>, report: ConversionReport) -> Self {
        Self {
            phase,
            source: source.into(),
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejections_are_per_object() {
        let rejected = AdapterError::Rejected {
            handle: NativeHandle::new("h1"),
            reason: "zero length".into(),
        };
        assert!(rejected.is_per_object());
        assert!(!SyncError::from(rejected).is_fatal());
        assert!(SyncError::from(AdapterError::NoDocument).is_fatal());
        assert!(SyncError::Conversion(ConversionError::fatal("x")).is_fatal());
    }

    #[test]
    fn failure_display_names_phase() {
        let failure = SyncFailure::new(
            SyncPhase::Applying,
            AdapterError::Transaction("locked".into()),
            ConversionReport::new(),
        );
        assert_eq!(
            failure.to_string(),
            "synchronization failed during applying: adapter error: transaction failed: locked"
        );
    }
}
