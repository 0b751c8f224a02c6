//! In-memory native model

use conduit_engine::{AdapterError, ExistingPoint, NativeAdapter};
use conduit_model::{NativeHandle, NativeObjectSpec, Point3, VariantTag};
use indexmap::{IndexMap, IndexSet};

/// Calls the engine made against a [`MemoryAdapter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterCalls {
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

/// Native model kept in memory, with injectable failures
///
/// Changes are staged between `begin` and `commit`; `rollback` drops them.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    objects: IndexMap<NativeHandle, NativeObjectSpec>,
    staged: Option<IndexMap<NativeHandle, NativeObjectSpec>>,
    existing: Vec<ExistingPoint>,
    calls: AdapterCalls,
    labels: Vec<String>,
    unavailable: bool,
    fail_begin: bool,
    fail_commit: bool,
    fail_create_after: Option<usize>,
    rejected_variants: IndexSet<VariantTag>,
    reassign_handles: bool,
    next_native: u64,
}

impl MemoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `check_available` reports the application as unreachable
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    #[must_use]
    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    #[must_use]
    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Break the transaction once `n` creates have succeeded
    #[must_use]
    pub fn failing_create_after(mut self, n: usize) -> Self {
        self.fail_create_after = Some(n);
        self
    }

    /// Refuse creates and updates of one variant
    #[must_use]
    pub fn rejecting(mut self, variant: impl Into<VariantTag>) -> Self {
        self.rejected_variants.insert(variant.into());
        self
    }

    /// Hand out native handles instead of honouring the requested ones
    #[must_use]
    pub fn reassigning_handles(mut self) -> Self {
        self.reassign_handles = true;
        self
    }

    /// A point that exists before any run
    #[must_use]
    pub fn with_existing_point(
        mut self,
        handle: &str,
        variant: &str,
        name: &str,
        location: Point3,
    ) -> Self {
        let handle = NativeHandle::new(handle);
        let spec = NativeObjectSpec::new(handle.clone(), variant)
            .with_name(name)
            .with_location(location);
        self.objects.insert(handle.clone(), spec);
        self.existing.push(ExistingPoint {
            handle,
            variant: variant.into(),
            name: name.to_string(),
            location,
        });
        self
    }

    /// Committed objects in creation order
    #[must_use]
    pub fn objects(&self) -> &IndexMap<NativeHandle, NativeObjectSpec> {
        &self.objects
    }

    #[must_use]
    pub fn get(&self, handle: &str) -> Option<&NativeObjectSpec> {
        self.objects.get(&NativeHandle::new(handle))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Committed objects of one variant
    #[must_use]
    pub fn count(&self, variant: &str) -> usize {
        self.objects
            .values()
            .filter(|spec| spec.variant.as_str() == variant)
            .count()
    }

    #[must_use]
    pub fn calls(&self) -> AdapterCalls {
        self.calls
    }

    /// Transaction labels passed to `begin`
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Delete an object outside any run, as a user editing the model would
    pub fn remove(&mut self, handle: &str) -> Option<NativeObjectSpec> {
        self.objects.shift_remove(&NativeHandle::new(handle))
    }

    /// Forget recorded calls between runs
    pub fn reset_calls(&mut self) {
        self.calls = AdapterCalls::default();
    }

    fn staged(&mut self) -> Result<&mut IndexMap<NativeHandle, NativeObjectSpec>, AdapterError> {
        self.staged
            .as_mut()
            .ok_or_else(|| AdapterError::Transaction("no open transaction".into()))
    }

    fn check_variant(&self, handle: &NativeHandle, spec: &NativeObjectSpec) -> Result<(), AdapterError> {
        if self.rejected_variants.contains(&spec.variant) {
            return Err(AdapterError::Rejected {
                handle: handle.clone(),
                reason: format!("{} objects are read-only", spec.variant),
            });
        }
        Ok(())
    }
}

impl NativeAdapter for MemoryAdapter {
    fn check_available(&self) -> Result<(), AdapterError> {
        if self.unavailable {
            return Err(AdapterError::Unavailable("application not running".into()));
        }
        Ok(())
    }

    fn begin(&mut self, label: &str) -> Result<(), AdapterError> {
        self.calls.begins += 1;
        if self.fail_begin {
            return Err(AdapterError::Transaction("document is locked".into()));
        }
        if self.staged.is_some() {
            return Err(AdapterError::Transaction("transaction already open".into()));
        }
        self.labels.push(label.to_string());
        self.staged = Some(self.objects.clone());
        Ok(())
    }

    fn create(&mut self, spec: &NativeObjectSpec) -> Result<NativeHandle, AdapterError> {
        self.check_variant(&spec.handle, spec)?;
        if let Some(limit) = self.fail_create_after {
            if self.calls.creates >= limit {
                return Err(AdapterError::Transaction("native model crashed".into()));
            }
        }
        let handle = if self.reassign_handles {
            self.next_native += 1;
            NativeHandle::new(format!("native-{}", self.next_native))
        } else {
            spec.handle.clone()
        };
        let staged = self.staged()?;
        if staged.contains_key(&handle) {
            return Err(AdapterError::Rejected {
                handle,
                reason: "handle already in use".into(),
            });
        }
        let mut stored = spec.clone();
        stored.handle = handle.clone();
        staged.insert(handle.clone(), stored);
        self.calls.creates += 1;
        Ok(handle)
    }

    fn update(&mut self, handle: &NativeHandle, spec: &NativeObjectSpec) -> Result<(), AdapterError> {
        self.check_variant(handle, spec)?;
        let staged = self.staged()?;
        let Some(slot) = staged.get_mut(handle) else {
            return Err(AdapterError::Rejected {
                handle: handle.clone(),
                reason: "no such object".into(),
            });
        };
        *slot = spec.clone();
        self.calls.updates += 1;
        Ok(())
    }

    fn delete(&mut self, handle: &NativeHandle) -> Result<(), AdapterError> {
        let staged = self.staged()?;
        if staged.shift_remove(handle).is_none() {
            return Err(AdapterError::Rejected {
                handle: handle.clone(),
                reason: "no such object".into(),
            });
        }
        self.calls.deletes += 1;
        Ok(())
    }

    fn resolve(&self, handle: &NativeHandle) -> Result<bool, AdapterError> {
        let objects = self.staged.as_ref().unwrap_or(&self.objects);
        Ok(objects.contains_key(handle))
    }

    fn commit(&mut self) -> Result<(), AdapterError> {
        if self.fail_commit {
            return Err(AdapterError::Transaction("commit refused".into()));
        }
        let staged = self
            .staged
            .take()
            .ok_or_else(|| AdapterError::Transaction("no open transaction".into()))?;
        self.objects = staged;
        self.calls.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged = None;
        self.calls.rollbacks += 1;
    }

    fn existing_points(&self) -> Result<Vec<ExistingPoint>, AdapterError> {
        Ok(self.existing.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_discards_staged_objects() {
        let mut adapter = MemoryAdapter::new();
        adapter.begin("t").unwrap();
        adapter
            .create(&NativeObjectSpec::new("h1".into(), "point"))
            .unwrap();
        assert!(adapter.resolve(&"h1".into()).unwrap());
        adapter.rollback();
        assert!(!adapter.resolve(&"h1".into()).unwrap());
        assert!(adapter.is_empty());
    }

    #[test]
    fn writes_need_a_transaction() {
        let mut adapter = MemoryAdapter::new();
        let err = adapter
            .create(&NativeObjectSpec::new("h1".into(), "point"))
            .unwrap_err();
        assert!(matches!(err, AdapterError::Transaction(_)));
    }
}
