//! Engine configuration

use crate::error::ConfigError;
use conduit_context::{ContextSettings, DEFAULT_TOLERANCE};
use conduit_model::{ConversionError, ConversionResult, InterchangeNode, LengthUnit};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Synchronization engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Coincidence tolerance, meters
    pub coincidence_tolerance: f64,
    /// Root-node property overriding the tolerance
    pub tolerance_property: String,
    /// Prefix of external ids that carry a native handle
    pub native_id_prefix: Option<String>,
    /// Attach points lying on members as their internal points
    pub snap_internal_points: bool,
    /// Keep previous handles of ids whose conversion failed
    pub preserve_failed: bool,
    /// Label of the adapter transaction
    pub transaction_label: String,
    /// Prefix for generated point names
    pub name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coincidence_tolerance: DEFAULT_TOLERANCE,
            tolerance_property: "coincidenceTolerance".to_string(),
            native_id_prefix: None,
            snap_internal_points: true,
            preserve_failed: false,
            transaction_label: "Conduit synchronization".to_string(),
            name_prefix: "N".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.coincidence_tolerance.is_finite() || self.coincidence_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "coincidence_tolerance must be a non-negative number, got {}",
                self.coincidence_tolerance
            )));
        }
        if self.name_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("name_prefix must not be blank".into()));
        }
        Ok(())
    }

    /// With tolerance
    #[inline]
    #[must_use]
    pub fn with_tolerance(mut self, meters: f64) -> Self {
        self.coincidence_tolerance = meters;
        self
    }

    /// With native id prefix
    #[inline]
    #[must_use]
    pub fn with_native_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.native_id_prefix = Some(prefix.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_snap_internal_points(mut self, enabled: bool) -> Self {
        self.snap_internal_points = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_preserve_failed(mut self, enabled: bool) -> Self {
        self.preserve_failed = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Context settings for one run
    #[must_use]
    pub fn context_settings(&self) -> ContextSettings {
        ContextSettings {
            coincidence_tolerance: self.coincidence_tolerance,
            name_prefix: self.name_prefix.clone(),
            native_id_prefix: self.native_id_prefix.clone(),
        }
    }

    /// Document-level tolerance override, in meters
    ///
    /// Read from the root's tolerance property, scaled by the root's
    /// `units` tag.
    pub fn document_tolerance(&self, root: &InterchangeNode) -> ConversionResult<Option<f64>> {
        let Some(value) = root.f64(&self.tolerance_property)? else {
            return Ok(None);
        };
        let unit = LengthUnit::from_tag(root.str("units"))?;
        let meters = unit.to_meters(value);
        if !meters.is_finite() || meters < 0.0 {
            return Err(ConversionError::invalid_input(format!(
                "{} must be a non-negative number, got {value}",
                self.tolerance_property
            )));
        }
        Ok(Some(meters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn toml_overrides_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            coincidence_tolerance = 0.001
            native_id_prefix = "ADM."
            preserve_failed = true
            "#,
        )
        .unwrap();
        assert_eq!(config.coincidence_tolerance, 0.001);
        assert_eq!(config.native_id_prefix.as_deref(), Some("ADM."));
        assert!(config.preserve_failed);
        assert!(config.snap_internal_points);
        assert_eq!(config.name_prefix, "N");
    }

    #[test]
    fn rejects_negative_tolerance() {
        let err = EngineConfig::from_toml_str("coincidence_tolerance = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = EngineConfig::new()
            .with_tolerance(0.01)
            .with_native_id_prefix("X.");
        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn document_tolerance_honours_units() {
        let config = EngineConfig::new();
        let root = InterchangeNode::new("Model")
            .with_property("coincidenceTolerance", 5)
            .with_property("units", "mm");
        let eps = config.document_tolerance(&root).unwrap().unwrap();
        assert!((eps - 0.005).abs() < 1e-15);

        let plain = InterchangeNode::new("Model");
        assert_eq!(config.document_tolerance(&plain).unwrap(), None);
    }
}
