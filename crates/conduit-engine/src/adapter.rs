//! Native document adapter interface
//!
//! The adapter is the engine's only path into the native application. All
//! create, update and delete calls of a run happen between one `begin` and
//! one `commit` (or `rollback`).

use crate::error::AdapterError;
use conduit_model::{NativeHandle, NativeObjectSpec, Point3, VariantTag};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// A point-like object already present in the native document
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingPoint {
    pub handle: NativeHandle,
    pub variant: VariantTag,
    pub name: String,
    pub location: Point3,
}

/// Access to the native model
pub trait NativeAdapter {
    /// Fail with `Unavailable` or `NoDocument` when a run cannot start
    fn check_available(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Open the transaction for this run
    fn begin(&mut self, label: &str) -> Result<(), AdapterError>;

    /// Create an object; the returned handle may differ from `spec.handle`
    fn create(&mut self, spec: &NativeObjectSpec) -> Result<NativeHandle, AdapterError>;

    fn update(&mut self, handle: &NativeHandle, spec: &NativeObjectSpec)
        -> Result<(), AdapterError>;

    fn delete(&mut self, handle: &NativeHandle) -> Result<(), AdapterError>;

    /// Whether the handle refers to a live object
    fn resolve(&self, handle: &NativeHandle) -> Result<bool, AdapterError>;

    fn commit(&mut self) -> Result<(), AdapterError>;

    /// Discard everything since `begin`
    fn rollback(&mut self);

    /// Point-like objects present before the run, used to seed the
    /// geometric index and name registry
    fn existing_points(&self) -> Result<Vec<ExistingPoint>, AdapterError> {
        Ok(Vec::new())
    }
}

impl<A: NativeAdapter + ?Sized> NativeAdapter for &mut A {
    fn check_available(&self) -> Result<(), AdapterError> {
        (**self).check_available()
    }

    fn begin(&mut self, label: &str) -> Result<(), AdapterError> {
        (**self).begin(label)
    }

    fn create(&mut self, spec: &NativeObjectSpec) -> Result<NativeHandle, AdapterError> {
        (**self).create(spec)
    }

    fn update(
        &mut self,
        handle: &NativeHandle,
        spec: &NativeObjectSpec,
    ) -> Result<(), AdapterError> {
        (**self).update(handle, spec)
    }

    fn delete(&mut self, handle: &NativeHandle) -> Result<(), AdapterError> {
        (**self).delete(handle)
    }

    fn resolve(&self, handle: &NativeHandle) -> Result<bool, AdapterError> {
        (**self).resolve(handle)
    }

    fn commit(&mut self) -> Result<(), AdapterError> {
        (**self).commit()
    }

    fn rollback(&mut self) {
        (**self).rollback();
    }

    fn existing_points(&self) -> Result<Vec<ExistingPoint>, AdapterError> {
        (**self).existing_points()
    }
}

/// Adapter shared across threads behind a single-writer lock
///
/// A driver run should hold [`SharedAdapter::lock`] for its whole duration;
/// the trait impl locks per call for simple callers.
#[derive(Debug, Default)]
pub struct SharedAdapter<A> {
    inner: Arc<Mutex<A>>,
}

impl<A> Clone for SharedAdapter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> SharedAdapter<A> {
    #[must_use]
    pub fn new(adapter: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(adapter)),
        }
    }

    /// Exclusive access for the duration of a run
    pub fn lock(&self) -> MutexGuard<'_, A> {
        self.inner.lock()
    }
}

impl<A: NativeAdapter> NativeAdapter for SharedAdapter<A> {
    fn check_available(&self) -> Result<(), AdapterError> {
        self.inner.lock().check_available()
    }

    fn begin(&mut self, label: &str) -> Result<(), AdapterError> {
        self.inner.lock().begin(label)
    }

    fn create(&mut self, spec: &NativeObjectSpec) -> Result<NativeHandle, AdapterError> {
        self.inner.lock().create(spec)
    }

    fn update(
        &mut self,
        handle: &NativeHandle,
        spec: &NativeObjectSpec,
    ) -> Result<(), AdapterError> {
        self.inner.lock().update(handle, spec)
    }

    fn delete(&mut self, handle: &NativeHandle) -> Result<(), AdapterError> {
        self.inner.lock().delete(handle)
    }

    fn resolve(&self, handle: &NativeHandle) -> Result<bool, AdapterError> {
        self.inner.lock().resolve(handle)
    }

    fn commit(&mut self) -> Result<(), AdapterError> {
        self.inner.lock().commit()
    }

    fn rollback(&mut self) {
        self.inner.lock().rollback();
    }

    fn existing_points(&self) -> Result<Vec<ExistingPoint>, AdapterError> {
        self.inner.lock().existing_points()
    }
}
