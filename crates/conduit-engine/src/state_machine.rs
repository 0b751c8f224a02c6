use crate::error::StateMachineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncPhase {
    Idle,
    Walking,
    Scheduling,
    Converting,
    Reconciling,
    Applying,
    Done,
    Cancelled,
    Failed,
}

impl SyncPhase {
    pub const ALL: [SyncPhase; 9] = [
        SyncPhase::Idle,
        SyncPhase::Walking,
        SyncPhase::Scheduling,
        SyncPhase::Converting,
        SyncPhase::Reconciling,
        SyncPhase::Applying,
        SyncPhase::Done,
        SyncPhase::Cancelled,
        SyncPhase::Failed,
    ];

    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walking => "walking",
            Self::Scheduling => "scheduling",
            Self::Converting => "converting",
            Self::Reconciling => "reconciling",
            Self::Applying => "applying",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Validates a phase transition.
///
/// Illegal transitions return an error; with the `strict-debug` feature they
/// panic instead.
pub fn validate_transition(from: SyncPhase, to: SyncPhase) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal phase transition attempted: {:?} -> {:?}", from, to);

        #[allow(unreachable_code)]
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: SyncPhase) -> Vec<SyncPhase> {
    use SyncPhase::*;
    match from {
        Idle => vec![Walking, Cancelled, Failed],
        Walking => vec![Scheduling, Cancelled, Failed],
        Scheduling => vec![Converting, Cancelled],
        Converting => vec![Reconciling, Cancelled, Failed],
        Reconciling => vec![Applying, Cancelled],
        Applying => vec![Done, Cancelled, Failed],
        Done => vec![],
        Cancelled => vec![],
        Failed => vec![],
    }
}

fn allowed(from: SyncPhase, to: SyncPhase) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

/// Current phase plus the path taken to reach it
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: SyncPhase,
    history: Vec<SyncPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            current: SyncPhase::Idle,
            history: vec![SyncPhase::Idle],
        }
    }
}

impl PhaseTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> SyncPhase {
        self.current
    }

    #[must_use]
    pub fn history(&self) -> &[SyncPhase] {
        &self.history
    }

    /// Move to `to` if the transition is legal
    pub fn advance(&mut self, to: SyncPhase) -> Result<(), StateMachineError> {
        validate_transition(self.current, to)?;
        match to {
            SyncPhase::Failed => tracing::error!("phase {} -> {}", self.current, to),
            SyncPhase::Cancelled => tracing::warn!("phase {} -> {}", self.current, to),
            _ => tracing::info!("phase {} -> {}", self.current, to),
        }
        self.current = to;
        self.history.push(to);
        Ok(())
    }
}
