//! Identity registry
//!
//! Maps an external id to the native objects produced from it during one
//! run, grouped by variant. Registration only appends, so a checkpoint is a
//! journal length and rollback pops the journal.

use crate::error::ContextError;
use conduit_model::{ExternalId, NativeHandle, NativeRef, VariantTag};
use indexmap::IndexMap;

/// `externalId -> { variant -> [handles] }`
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    entries: IndexMap<ExternalId, IndexMap<VariantTag, Vec<NativeHandle>>>,
    journal: Vec<(ExternalId, VariantTag)>,
}

impl IdentityRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles registered for `id` under `variant`
    ///
    /// `None` unless the id is registered and at least one object matches
    /// the variant.
    #[must_use]
    pub fn lookup(&self, id: &ExternalId, variant: &VariantTag) -> Option<&[NativeHandle]> {
        self.entries
            .get(id)
            .and_then(|variants| variants.get(variant))
            .map(Vec::as_slice)
            .filter(|handles| !handles.is_empty())
    }

    /// Append objects to the entry for `id`
    ///
    /// With `exclusive`, fails if the entry already holds a different
    /// variant. Re-registering an identical reference is a no-op.
    pub fn register(
        &mut self,
        id: &ExternalId,
        objects: impl IntoIterator<Item = NativeRef>,
        exclusive: bool,
    ) -> Result<(), ContextError> {
        let objects: Vec<NativeRef> = objects.into_iter().collect();
        if exclusive {
            if let Some(variants) = self.entries.get(id) {
                for object in &objects {
                    if let Some(existing) = variants.keys().find(|v| **v != object.variant) {
                        return Err(ContextError::VariantConflict {
                            id: id.clone(),
                            existing: existing.clone(),
                            requested: object.variant.clone(),
                        });
                    }
                }
            }
        }

        for object in objects {
            let handles = self
                .entries
                .entry(id.clone())
                .or_default()
                .entry(object.variant.clone())
                .or_default();
            if handles.contains(&object.handle) {
                continue;
            }
            handles.push(object.handle);
            self.journal.push((id.clone(), object.variant));
        }
        Ok(())
    }

    /// Whether anything is registered under `id`
    #[must_use]
    pub fn contains(&self, id: &ExternalId) -> bool {
        self.entries.contains_key(id)
    }

    /// Every object registered under `id`, grouped by variant order
    #[must_use]
    pub fn objects(&self, id: &ExternalId) -> Vec<NativeRef> {
        self.entries
            .get(id)
            .map(|variants| {
                variants
                    .iter()
                    .flat_map(|(variant, handles)| {
                        handles
                            .iter()
                            .map(|h| NativeRef::new(h.clone(), variant.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of registered external ids
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

    pub(crate) fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    pub(crate) fn rollback(&mut self, checkpoint: usize) {
        while self.journal.len() > checkpoint {
            let Some((id, variant)) = self.journal.pop() else {
                break;
            };
            let Some(variants) = self.entries.get_mut(&id) else {
                continue;
            };
            if let Some(handles) = variants.get_mut(&variant) {
                handles.pop();
                if handles.is_empty() {
                    variants.shift_remove(&variant);
                }
            }
            if variants.is_empty() {
                self.entries.shift_remove(&id);
            }
        }
    }
}
