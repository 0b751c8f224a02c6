//! Placeholders: the persisted outcome of one synchronization run

use crate::ids::{ExternalId, NativeHandle};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of converting one external id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceholderStatus {
    Created,
    Updated,
    Skipped,
    Failed,
}

impl PlaceholderStatus {
    /// Whether the id survived conversion and should be persisted
    #[inline]
    #[must_use]
    pub fn survived(self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

impl fmt::Display for PlaceholderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// `{ externalId, nativeHandles, status }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub external_id: ExternalId,
    pub native_handles: Vec<NativeHandle>,
    pub status: PlaceholderStatus,
}

impl Placeholder {
    #[must_use]
    pub fn new(
        external_id: impl Into<ExternalId>,
        native_handles: Vec<NativeHandle>,
        status: PlaceholderStatus,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            native_handles,
            status,
        }
    }
}

/// Ordered placeholders keyed by external id
///
/// Serializes as a plain list so the persisted form stays readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Placeholder>", into = "Vec<Placeholder>")]
pub struct PlaceholderSet {
    entries: IndexMap<ExternalId, Placeholder>,
}

impl PlaceholderSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced entry keeps its position
    pub fn insert(&mut self, placeholder: Placeholder) {
        self.entries
            .insert(placeholder.external_id.clone(), placeholder);
    }

    #[must_use]
    pub fn get(&self, id: &ExternalId) -> Option<&Placeholder> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &ExternalId) -> Option<&mut Placeholder> {
        self.entries.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ExternalId) -> bool {
        self.entries.contains_key(id)
    }

    /// Handles of an id, empty when unknown
    #[must_use]
    pub fn handles(&self, id: &ExternalId) -> &[NativeHandle] {
        self.entries
            .get(id)
            .map(|p| p.native_handles.as_slice())
            .unwrap_or_default()
    }

    /// Whether any entry owns this handle
    #[must_use]
    pub fn owns_handle(&self, handle: &NativeHandle) -> bool {
        self.entries
            .values()
            .any(|p| p.native_handles.contains(handle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Placeholder> {
        self.entries.values_mut()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Placeholder) -> bool) {
        self.entries.retain(|_, p| keep(p));
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

    /// Count of entries with the given status
    #[must_use]
    pub fn count(&self, status: PlaceholderStatus) -> usize {
        self.entries.values().filter(|p| p.status == status).count()
    }
}

impl From<Vec<Placeholder>> for PlaceholderSet {
    fn from(list: Vec<Placeholder>) -> Self {
        list.into_iter().collect()
    }
}

impl From<PlaceholderSet> for Vec<Placeholder> {
    fn from(set: PlaceholderSet) -> Self {
        set.entries.into_values().collect()
    }
}

impl FromIterator<Placeholder> for PlaceholderSet {
    fn from_iter<I: IntoIterator<Item = Placeholder>>(iter: I) -> Self {
        let mut set = Self::new();
        for placeholder in iter {
            set.insert(placeholder);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PlaceholderSet {
    type Item = &'a Placeholder;
    type IntoIter = indexmap::map::Values<'a, ExternalId, Placeholder>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
