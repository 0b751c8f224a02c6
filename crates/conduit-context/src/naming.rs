//! Unique name generation
//!
//! Generated names are `prefix + index`. Each candidate is checked
//! case-insensitively against the names already taken for that entity type;
//! the counter for a prefix persists for the run.

use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NameCheckpoint {
    journal: usize,
}

#[derive(Debug, Clone)]
enum NameEvent {
    Reserved { entity: String, folded: String },
    Counter { prefix: String, previous: u64 },
}

/// Names taken per entity type plus per-prefix counters
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    taken: IndexMap<String, IndexSet<String>>,
    counters: IndexMap<String, u64>,
    journal: Vec<NameEvent>,
}

impl NameRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is taken for `entity`, ignoring case
    #[must_use]
    pub fn is_taken(&self, entity: &str, name: &str) -> bool {
        self.taken
            .get(entity)
            .is_some_and(|names| names.contains(&fold(name)))
    }

    /// Mark a name as taken; returns false if it already was
    pub fn reserve(&mut self, entity: &str, name: &str) -> bool {
        let folded = fold(name);
        let inserted = self
            .taken
            .entry(entity.to_string())
            .or_default()
            .insert(folded.clone());
        if inserted {
            self.journal.push(NameEvent::Reserved {
                entity: entity.to_string(),
                folded,
            });
        }
        inserted
    }

    /// Generate and reserve the next free `prefix + index` name
    pub fn next_unique(&mut self, entity: &str, prefix: &str) -> String {
        let previous = self.counters.get(prefix).copied().unwrap_or(0);
        self.journal.push(NameEvent::Counter {
            prefix: prefix.to_string(),
            previous,
        });

        let mut counter = previous;
        let name = loop {
            counter += 1;
            let candidate = format!("{prefix}{counter}");
            if !self.is_taken(entity, &candidate) {
                break candidate;
            }
        };
        self.counters.insert(prefix.to_string(), counter);
        self.reserve(entity, &name);
        name
    }

    pub(crate) fn checkpoint(&self) -> NameCheckpoint {
        NameCheckpoint {
            journal: self.journal.len(),
        }
    }

    pub(crate) fn rollback(&mut self, checkpoint: NameCheckpoint) {
        while self.journal.len() > checkpoint.journal {
            match self.journal.pop() {
                Some(NameEvent::Reserved { entity, folded }) => {
                    if let Some(names) = self.taken.get_mut(&entity) {
                        names.shift_remove(&folded);
                    }
                }
                Some(NameEvent::Counter { prefix, previous }) => {
                    self.counters.insert(prefix, previous);
                }
                None => break,
            }
        }
    }
}

/// Case-folded form used for name comparisons
pub(crate) fn fold(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_names_taken_in_any_case() {
        let mut names = NameRegistry::new();
        names.reserve("point", "n1");
        names.reserve("point", "N3");
        assert_eq!(names.next_unique("point", "N"), "N2");
        assert_eq!(names.next_unique("point", "N"), "N4");
    }

    #[test]
    fn counters_are_per_prefix_and_names_per_entity() {
        let mut names = NameRegistry::new();
        names.reserve("support", "N1");
        assert_eq!(names.next_unique("point", "N"), "N1");
        assert_eq!(names.next_unique("point", "P"), "P1");
        assert_eq!(names.next_unique("point", "N"), "N2");
    }

    #[test]
    fn rollback_releases_names_and_counter() {
        let mut names = NameRegistry::new();
        assert_eq!(names.next_unique("point", "N"), "N1");
        let cp = names.checkpoint();
        assert_eq!(names.next_unique("point", "N"), "N2");
        names.rollback(cp);
        assert!(!names.is_taken("point", "n2"));
        assert_eq!(names.next_unique("point", "N"), "N2");
    }
}
