// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory snapshot store.
//!
//! [`MemoryStore`] backs dry runs (a copy of a real listing that rotation can
//! be played against) and tests.

use std::collections::{BTreeMap, BTreeSet};

use time::OffsetDateTime;

use crate::store::{Entry, SnapshotStore, StoreError};

/// Map of entry name to modification time.
///
/// The store keeps its own clock: [`create_empty`](SnapshotStore::create_empty)
/// stamps entries with [`now`](MemoryStore::now). Renames carry the source's
/// timestamp across, like a directory `mv`.
///
/// Names registered with [`fail_on`](MemoryStore::fail_on) make every mutating
/// operation that touches them fail, which lets tests interrupt a cascade at a
/// chosen step.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    entries: BTreeMap<String, OffsetDateTime>,
    now: OffsetDateTime,
    failing: BTreeSet<String>,
    ops: usize,
}

impl MemoryStore {
    /// Create an empty store whose clock reads `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            entries: BTreeMap::new(),
            now,
            failing: BTreeSet::new(),
            ops: 0,
        }
    }

    /// Seed a store from an existing listing.
    pub fn from_entries<I>(entries: I, now: OffsetDateTime) -> Self
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut store = Self::new(now);
        for entry in entries {
            store.entries.insert(entry.name, entry.modified);
        }
        store
    }

    /// Insert or overwrite an entry directly.
    pub fn insert(&mut self, name: impl Into<String>, modified: OffsetDateTime) {
        self.entries.insert(name.into(), modified);
    }

    /// Current clock reading.
    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    /// Move the clock.
    pub fn set_now(&mut self, now: OffsetDateTime) {
        self.now = now;
    }

    /// Make mutating operations on `name` fail.
    pub fn fail_on(&mut self, name: impl Into<String>) {
        self.failing.insert(name.into());
    }

    /// Stop failing operations on `name`.
    pub fn heal(&mut self, name: &str) {
        self.failing.remove(name);
    }

    /// Names currently held, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Modification time of `name`, if present.
    pub fn modified(&self, name: &str) -> Option<OffsetDateTime> {
        self.entries.get(name).copied()
    }

    /// Number of successful mutating operations so far.
    pub fn op_count(&self) -> usize {
        self.ops
    }

    fn check(&self, op: &'static str, name: &str) -> Result<(), StoreError> {
        if self.failing.contains(name) {
            return Err(StoreError::Io {
                op,
                name: name.to_owned(),
                source: std::io::Error::other("injected failure"),
            });
        }
        Ok(())
    }
}

impl SnapshotStore for MemoryStore {
    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|(name, modified)| Entry::new(name.clone(), *modified))
            .collect())
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.entries.contains_key(name))
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        self.check("rename", from)?;
        self.check("rename", to)?;
        if self.entries.contains_key(to) {
            return Err(StoreError::Exists(to.to_owned()));
        }
        let modified = self
            .entries
            .remove(from)
            .ok_or_else(|| StoreError::NotFound(from.to_owned()))?;
        self.entries.insert(to.to_owned(), modified);
        self.ops += 1;
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        self.check("delete", name)?;
        self.entries
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))?;
        self.ops += 1;
        Ok(())
    }

    fn create_empty(&mut self, name: &str) -> Result<(), StoreError> {
        self.check("create", name)?;
        self.entries.insert(name.to_owned(), self.now);
        self.ops += 1;
        Ok(())
    }
}
