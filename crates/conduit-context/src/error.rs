//! Error types for the conversion context

use conduit_model::{ConversionError, ExternalId, Point3, VariantTag};

/// Context operation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContextError {
    /// Exclusive registration over an entry holding another variant
    #[error("{id} is already registered as {existing}, cannot register as {requested}")]
    VariantConflict {
        id: ExternalId,
        existing: VariantTag,
        requested: VariantTag,
    },

    /// Keyed point found outside tolerance
    #[error("same key, incompatible location: '{key}' at {existing} vs {requested} ({distance} > {epsilon})")]
    KeyMismatch {
        key: String,
        existing: Point3,
        requested: Point3,
        distance: f64,
        epsilon: f64,
    },

    /// Keyed point whose name is already held by another entity
    #[error("name '{name}' is already used by another {variant}")]
    NameTaken { name: String, variant: VariantTag },

    /// Handle or point requested outside a node conversion
    #[error("no node is being converted")]
    NoCurrentNode,

    /// Epsilon must be finite and non-negative
    #[error("invalid coincidence tolerance: {0}")]
    InvalidTolerance(f64),

    /// Coordinates with NaN or infinity
    #[error("non-finite coordinates {0}")]
    NonFinite(Point3),

    /// Export reached a node already being converted
    #[error("cycle detected")]
    Cycle,
}

impl ContextError {
    /// Whether this error is an identity or tolerance violation
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::VariantConflict { .. }
                | Self::KeyMismatch { .. }
                | Self::NameTaken { .. }
                | Self::Cycle
        )
    }
}

impl From<ContextError> for ConversionError {
    fn from(err: ContextError) -> Self {
        let cause = match &err {
            ContextError::VariantConflict { id, .. } => Some(id.clone()),
            _ => None,
        };
        let converted = match &err {
            ContextError::NoCurrentNode => ConversionError::fatal(err.to_string()),
            e if e.is_conflict() => ConversionError::conflict(err.to_string()),
            _ => ConversionError::invalid_input(err.to_string()),
        };
        converted.with_cause(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_model::ErrorKind;

    #[test]
    fn classification_into_conversion_errors() {
        let err: ConversionError = ContextError::KeyMismatch {
            key: "N1".into(),
            existing: Point3::ORIGIN,
            requested: Point3::new(1.0, 0.0, 0.0),
            distance: 1.0,
            epsilon: 1e-9,
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.message.starts_with("same key, incompatible location"));

        let err: ConversionError = ContextError::NonFinite(Point3::new(f64::NAN, 0.0, 0.0)).into();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn variant_conflict_carries_cause() {
        let err: ConversionError = ContextError::VariantConflict {
            id: ExternalId::new("a1"),
            existing: "point".into(),
            requested: "member".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.cause, Some(ExternalId::new("a1")));
    }
}
