//! Placeholder persistence
//!
//! The placeholder set written after a successful run becomes the
//! "previous" state of the next run.

use crate::error::StoreError;
use conduit_model::PlaceholderSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Load and save the previous placeholder set
pub trait PlaceholderStore {
    fn load(&self) -> Result<PlaceholderSet, StoreError>;

    fn save(&mut self, placeholders: &PlaceholderSet) -> Result<(), StoreError>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    placeholders: PlaceholderSet,
    saves: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_placeholders(placeholders: PlaceholderSet) -> Self {
        Self {
            placeholders,
            saves: 0,
        }
    }

    #[must_use]
    pub fn placeholders(&self) -> &PlaceholderSet {
        &self.placeholders
    }

    /// Number of successful saves
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl PlaceholderStore for MemoryStore {
    fn load(&self) -> Result<PlaceholderSet, StoreError> {
        Ok(self.placeholders.clone())
    }

    fn save(&mut self, placeholders: &PlaceholderSet) -> Result<(), StoreError> {
        self.placeholders = placeholders.clone();
        self.saves += 1;
        Ok(())
    }
}

/// JSON file store
///
/// A missing file loads as an empty set. Saves go through a sibling
/// temporary file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PlaceholderStore for JsonFileStore {
    fn load(&self) -> Result<PlaceholderSet, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PlaceholderSet::new()),
            Err(e) => Err(self.io(e)),
        }
    }

    fn save(&mut self, placeholders: &PlaceholderSet) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(placeholders)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text).map_err(|e| self.io(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io(e))?;
        tracing::debug!("saved {} placeholders to {}", placeholders.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_model::{NativeHandle, Placeholder, PlaceholderStatus};

    fn sample() -> PlaceholderSet {
        vec![Placeholder::new(
            "a1",
            vec![NativeHandle::new("h1")],
            PlaceholderStatus::Created,
        )]
        .into()
    }

    #[test]
    fn json_store_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_empty());

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn malformed_state_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(path).load().unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn memory_store_counts_saves() {
        let mut store = MemoryStore::new();
        store.save(&sample()).unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
