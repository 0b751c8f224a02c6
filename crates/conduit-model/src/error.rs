//! Conversion error taxonomy
//!
//! Every failure raised while converting a single node is classified into
//! one [`ErrorKind`]. Only [`ErrorKind::Fatal`] aborts a run; the other kinds
//! are caught at the per-node boundary and recorded.

use crate::ids::ExternalId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a conversion failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Type not supported by the mapper; node dropped
    Skipped,
    /// Required field missing or malformed on one node
    InvalidInput,
    /// Identity or geometric tolerance violation
    Conflict,
    /// Adapter unavailable, no context document, transaction failure
    Fatal,
}

impl ErrorKind {
    /// Whether this kind aborts the entire run
    #[inline]
    #[must_use]
    pub fn aborts_run(self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Lowercase label used in summaries
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::InvalidInput => "invalid input",
            Self::Conflict => "conflict",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned by schema mappers and context operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ConversionError {
    /// Classification
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// External id of the node that caused the failure, if known
    pub cause: Option<ExternalId>,
}

impl ConversionError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Unsupported type
    #[inline]
    #[must_use]
    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Skipped, message)
    }

    /// Missing or malformed field
    #[inline]
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Identity or tolerance violation
    #[inline]
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Run-aborting failure
    #[inline]
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    /// Attach the causing node's external id (keeps an existing one)
    #[must_use]
    pub fn with_cause(mut self, cause: Option<ExternalId>) -> Self {
        if self.cause.is_none() {
            self.cause = cause;
        }
        self
    }

    /// Prefix the message with context, e.g. the failing node's type
    #[must_use]
    pub fn context(mut self, prefix: impl fmt::Display) -> Self {
        self.message = format!("{prefix}: {}", self.message);
        self
    }
}

/// Shorthand result for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fatal_aborts() {
        assert!(ErrorKind::Fatal.aborts_run());
        assert!(!ErrorKind::Skipped.aborts_run());
        assert!(!ErrorKind::InvalidInput.aborts_run());
        assert!(!ErrorKind::Conflict.aborts_run());
    }

    #[test]
    fn cause_is_not_overwritten() {
        let err = ConversionError::conflict("boom")
            .with_cause(Some(ExternalId::new("a")))
            .with_cause(Some(ExternalId::new("b")));
        assert_eq!(err.cause, Some(ExternalId::new("a")));
    }

    #[test]
    fn display_includes_kind() {
        let err = ConversionError::invalid_input("missing end1Node").context("Element1D");
        assert_eq!(err.to_string(), "invalid input: Element1D: missing end1Node");
    }
}
