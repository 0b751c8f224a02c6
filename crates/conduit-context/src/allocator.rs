//! Native handle allocation
//!
//! The k-th handle allocated for an external id in a run is the k-th handle
//! of that id's previous placeholder. Past the previous handles, an id that
//! carries the native-id prefix gets its suffix as first handle; everything
//! else gets a fresh v4 UUID.

use conduit_model::{ExternalId, NativeHandle, PlaceholderSet};
use indexmap::IndexMap;
use uuid::Uuid;

/// How a handle was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSource {
    /// Carried over from the previous run
    Previous,
    /// Derived from a prefixed external id
    NativeId,
    /// Newly generated
    Fresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AllocatorCheckpoint {
    journal: usize,
}

/// Per-run handle allocator
#[derive(Debug, Clone, Default)]
pub struct HandleAllocator {
    previous: IndexMap<ExternalId, Vec<NativeHandle>>,
    native_id_prefix: Option<String>,
    ordinals: IndexMap<ExternalId, usize>,
    journal: Vec<(ExternalId, HandleSource)>,
}

impl HandleAllocator {
    /// Allocator seeded with the previous run's handles
    #[must_use]
    pub fn new(previous: &PlaceholderSet, native_id_prefix: Option<String>) -> Self {
        Self {
            previous: previous
                .iter()
                .map(|p| (p.external_id.clone(), p.native_handles.clone()))
                .collect(),
            native_id_prefix: native_id_prefix.filter(|p| !p.is_empty()),
            ordinals: IndexMap::new(),
            journal: Vec::new(),
        }
    }

    /// Allocate the next handle for `id`
    pub fn allocate(&mut self, id: &ExternalId) -> (NativeHandle, HandleSource) {
        let ordinal = self.ordinals.entry(id.clone()).or_insert(0);
        let k = *ordinal;
        *ordinal += 1;

        let previous = self.previous.get(id).map(Vec::as_slice).unwrap_or_default();
        let (handle, source) = if let Some(handle) = previous.get(k) {
            (handle.clone(), HandleSource::Previous)
        } else if let Some(native) = self.native_suffix(id).filter(|_| k == 0) {
            (NativeHandle::new(native), HandleSource::NativeId)
        } else {
            (NativeHandle::new(Uuid::new_v4().to_string()), HandleSource::Fresh)
        };
        self.journal.push((id.clone(), source));
        (handle, source)
    }

    /// Suffix of a prefixed external id
    #[must_use]
    pub fn native_suffix<'a>(&self, id: &'a ExternalId) -> Option<&'a str> {
        let prefix = self.native_id_prefix.as_deref()?;
        id.strip_prefix(prefix)
    }

    /// Number of allocations by source in this run
    #[must_use]
    pub fn count(&self, source: HandleSource) -> usize {
        self.journal.iter().filter(|(_, s)| *s == source).count()
    }

    pub(crate) fn checkpoint(&self) -> AllocatorCheckpoint {
        AllocatorCheckpoint {
            journal: self.journal.len(),
        }
    }

    pub(crate) fn rollback(&mut self, checkpoint: AllocatorCheckpoint) {
        while self.journal.len() > checkpoint.journal {
            let Some((id, _)) = self.journal.pop() else {
                break;
            };
            if let Some(ordinal) = self.ordinals.get_mut(&id) {
                *ordinal = ordinal.saturating_sub(1);
            }
        }
    }
}
