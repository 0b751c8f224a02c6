//! Geometric deduplication index
//!
//! Point-like entities placed during one run, matched by key or by
//! Euclidean distance within a single run-wide epsilon. Keys and entity
//! names share one case-insensitive namespace: every entry is reachable by
//! its name, generated or not. Entries seeded from
//! the pre-existing native document are tracked separately so that a keyed
//! mismatch against them can be resolved by moving the entry instead of
//! failing.

use crate::error::ContextError;
use crate::naming::fold;
use conduit_model::{distance_to_polyline, NativeHandle, Point3};
use indexmap::IndexMap;

/// Default coincidence tolerance, meters
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Where an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Placed by a conversion in this run
    Current,
    /// Present in the native document before the run
    Existing,
}

/// One placed point
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricEntry {
    pub location: Point3,
    pub handle: NativeHandle,
    pub key: Option<String>,
    pub name: String,
    pub origin: EntryOrigin,
}

/// Result of a lookup
#[derive(Debug, Clone, PartialEq)]
pub enum PointMatch {
    /// Reuse this entry as is
    Found(GeometricEntry),
    /// Keyed entry from the pre-existing document at another location;
    /// the caller adopts it via [`GeometricIndex::relocate`]
    Displaced { entry: GeometricEntry, distance: f64 },
    /// Nothing matches; allocate a new entity
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GeometricCheckpoint {
    entries: usize,
    moves: usize,
}

/// Tolerance-based point index
#[derive(Debug, Clone)]
pub struct GeometricIndex {
    epsilon: f64,
    entries: Vec<GeometricEntry>,
    by_key: IndexMap<String, usize>,
    moves: Vec<(usize, Point3, EntryOrigin)>,
}

impl Default for GeometricIndex {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_TOLERANCE,
            entries: Vec::new(),
            by_key: IndexMap::new(),
            moves: Vec::new(),
        }
    }
}

impl GeometricIndex {
    /// Create an index with the given epsilon
    pub fn new(epsilon: f64) -> Result<Self, ContextError> {
        let mut index = Self::default();
        index.set_epsilon(epsilon)?;
        Ok(index)
    }

    #[inline]
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<(), ContextError> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(ContextError::InvalidTolerance(epsilon));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    /// Look up a point by key, or by proximity when no key is given
    pub fn find(&self, location: Point3, key: Option<&str>) -> Result<PointMatch, ContextError> {
        if !location.is_finite() {
            return Err(ContextError::NonFinite(location));
        }
        match key {
            Some(key) => {
                let Some(&index) = self.by_key.get(&fold(key)) else {
                    return Ok(PointMatch::Missing);
                };
                let entry = &self.entries[index];
                let distance = entry.location.distance(location);
                if distance <= self.epsilon {
                    Ok(PointMatch::Found(entry.clone()))
                } else if entry.origin == EntryOrigin::Existing {
                    Ok(PointMatch::Displaced {
                        entry: entry.clone(),
                        distance,
                    })
                } else {
                    Err(ContextError::KeyMismatch {
                        key: key.to_string(),
                        existing: entry.location,
                        requested: location,
                        distance,
                        epsilon: self.epsilon,
                    })
                }
            }
            None => Ok(self
                .nearest_within(location)
                .map_or(PointMatch::Missing, |e| PointMatch::Found(e.clone()))),
        }
    }

    /// First entry, in placement order, within epsilon of `location`
    #[must_use]
    pub fn nearest_within(&self, location: Point3) -> Option<&GeometricEntry> {
        self.entries
            .iter()
            .find(|e| e.location.distance(location) <= self.epsilon)
    }

    /// Record a point placed in this run
    pub fn insert(
        &mut self,
        location: Point3,
        handle: NativeHandle,
        key: Option<String>,
        name: String,
    ) -> Result<(), ContextError> {
        self.push(location, handle, key, name, EntryOrigin::Current)
    }

    /// Record a point that already exists in the native document
    pub fn seed(
        &mut self,
        location: Point3,
        handle: NativeHandle,
        key: Option<String>,
        name: String,
    ) -> Result<(), ContextError> {
        self.push(location, handle, key, name, EntryOrigin::Existing)
    }

    /// Move a keyed entry to a new location
    pub fn relocate(&mut self, key: &str, location: Point3) -> Option<&GeometricEntry> {
        let index = *self.by_key.get(&fold(key))?;
        let entry = &mut self.entries[index];
        self.moves.push((index, entry.location, entry.origin));
        entry.location = location;
        entry.origin = EntryOrigin::Current;
        Some(&self.entries[index])
    }

    /// Handles of every point within epsilon of a polyline
    #[must_use]
    pub fn points_on_polyline(&self, polyline: &[Point3]) -> Vec<NativeHandle> {
        self.entries
            .iter()
            .filter(|e| distance_to_polyline(e.location, polyline) <= self.epsilon)
            .map(|e| e.handle.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeometricEntry> {
        self.entries.iter()
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

    fn push(
        &mut self,
        location: Point3,
        handle: NativeHandle,
        key: Option<String>,
        name: String,
        origin: EntryOrigin,
    ) -> Result<(), ContextError> {
        if !location.is_finite() {
            return Err(ContextError::NonFinite(location));
        }
        // first entry under a name wins
        self.by_key.entry(fold(&name)).or_insert(self.entries.len());
        self.entries.push(GeometricEntry {
            location,
            handle,
            key,
            name,
            origin,
        });
        Ok(())
    }

    pub(crate) fn checkpoint(&self) -> GeometricCheckpoint {
        GeometricCheckpoint {
            entries: self.entries.len(),
            moves: self.moves.len(),
        }
    }

    pub(crate) fn rollback(&mut self, checkpoint: GeometricCheckpoint) {
        while self.moves.len() > checkpoint.moves {
            if let Some((index, location, origin)) = self.moves.pop() {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.location = location;
                    entry.origin = origin;
                }
            }
        }
        self.entries.truncate(checkpoint.entries);
        self.by_key.retain(|_, index| *index < checkpoint.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> GeometricIndex {
        GeometricIndex::new(1e-3).unwrap()
    }

    #[test]
    fn proximity_match_within_epsilon() {
        let mut idx = index();
        idx.insert(Point3::ORIGIN, "h1".into(), None, "N1".into())
            .unwrap();

        match idx.find(Point3::new(0.0005, 0.0, 0.0), None).unwrap() {
            PointMatch::Found(e) => assert_eq!(e.handle, NativeHandle::new("h1")),
            other => panic!("expected match, got {other:?}"),
        }
        assert_eq!(
            idx.find(Point3::new(0.002, 0.0, 0.0), None).unwrap(),
            PointMatch::Missing
        );
    }

    #[test]
    fn keyed_mismatch_in_current_run_conflicts() {
        let mut idx = index();
        idx.insert(Point3::ORIGIN, "h1".into(), Some("A".into()), "A".into())
            .unwrap();
        let err = idx.find(Point3::new(1.0, 0.0, 0.0), Some("A")).unwrap_err();
        assert!(matches!(err, ContextError::KeyMismatch { .. }));
        assert!(err.to_string().starts_with("same key, incompatible location"));
    }

    #[test]
    fn keyed_mismatch_against_existing_is_displaced() {
        let mut idx = index();
        idx.seed(Point3::ORIGIN, "h1".into(), Some("A".into()), "A".into())
            .unwrap();
        let found = idx.find(Point3::new(1.0, 0.0, 0.0), Some("A")).unwrap();
        assert!(matches!(found, PointMatch::Displaced { .. }));

        idx.relocate("A", Point3::new(1.0, 0.0, 0.0));
        assert!(matches!(
            idx.find(Point3::new(1.0, 0.0, 0.0), Some("A")).unwrap(),
            PointMatch::Found(_)
        ));
        // a second move in the same run is a conflict
        assert!(idx.find(Point3::new(2.0, 0.0, 0.0), Some("A")).is_err());
    }

    #[test]
    fn points_on_polyline_use_segment_distance() {
        let mut idx = index();
        idx.insert(Point3::new(5.0, 0.0005, 0.0), "mid".into(), None, "N1".into())
            .unwrap();
        idx.insert(Point3::new(12.0, 0.0, 0.0), "beyond".into(), None, "N2".into())
            .unwrap();
        let on = idx.points_on_polyline(&[Point3::ORIGIN, Point3::new(10.0, 0.0, 0.0)]);
        assert_eq!(on, vec![NativeHandle::new("mid")]);
    }

    #[test]
    fn rollback_drops_entries_and_restores_moves() {
        let mut idx = index();
        idx.seed(Point3::ORIGIN, "h1".into(), Some("A".into()), "A".into())
            .unwrap();
        let cp = idx.checkpoint();
        idx.relocate("A", Point3::new(3.0, 0.0, 0.0));
        idx.insert(Point3::new(9.0, 0.0, 0.0), "h2".into(), Some("B".into()), "B".into())
            .unwrap();
        idx.rollback(cp);

        assert_eq!(idx.len(), 1);
        assert!(matches!(idx.find(Point3::ORIGIN, Some("A")).unwrap(), PointMatch::Found(_)));
        assert_eq!(idx.find(Point3::new(9.0, 0.0, 0.0), Some("B")).unwrap(), PointMatch::Missing);
    }

    #[test]
    fn generated_names_are_reachable_as_keys() {
        let mut idx = index();
        idx.insert(Point3::ORIGIN, "h1".into(), None, "N1".into())
            .unwrap();
        match idx.find(Point3::ORIGIN, Some("n1")).unwrap() {
            PointMatch::Found(e) => assert_eq!(e.handle, NativeHandle::new("h1")),
            other => panic!("expected match, got {other:?}"),
        }
        assert!(idx.find(Point3::new(1.0, 0.0, 0.0), Some("N1")).is_err());
    }

    #[test]
    fn rejects_invalid_tolerance() {
        assert!(GeometricIndex::new(-1.0).is_err());
        assert!(GeometricIndex::new(f64::NAN).is_err());
    }
}
