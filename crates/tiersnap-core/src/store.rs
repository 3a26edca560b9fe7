// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Storage port: the primitive directory operations rotation is built from.

use thiserror::Error;
use time::OffsetDateTime;

/// One directory entry as reported by a backend listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Name relative to the snapshot root.
    pub name: String,
    /// Last modification time.
    pub modified: OffsetDateTime,
}

impl Entry {
    /// Build an entry.
    pub fn new(name: impl Into<String>, modified: OffsetDateTime) -> Self {
        Self {
            name: name.into(),
            modified,
        }
    }
}

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named entry does not exist.
    #[error("[STORE_NOT_FOUND] `{0}` does not exist")]
    NotFound(String),
    /// A rename target is already occupied.
    #[error("[STORE_EXISTS] `{0}` already exists")]
    Exists(String),
    /// Local filesystem failure.
    #[error("[STORE_IO] {op} `{name}`: {source}")]
    Io {
        /// Operation that failed (`rename`, `delete`, ...).
        op: &'static str,
        /// Entry the operation targeted.
        name: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A remote command could not be run or exited unsuccessfully.
    #[error("[STORE_TRANSPORT] {command}: {detail}")]
    Transport {
        /// Command line (or a short description of it).
        command: String,
        /// Exit status and captured stderr.
        detail: String,
    },
    /// A listing could not be understood.
    #[error("[STORE_MALFORMED] {0}")]
    Malformed(String),
}

/// Backend holding snapshot directories under one root.
///
/// All names are relative to that root. Implementations are synchronous and
/// blocking; timeouts belong to the transport, not the caller. Concurrent
/// runs against the same root are not coordinated.
pub trait SnapshotStore {
    /// List every entry directly under the root, snapshot or not.
    fn list(&self) -> Result<Vec<Entry>, StoreError>;

    /// Whether `name` exists.
    fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Move `from` to `to`. `to` must not exist; backends refuse rather than
    /// nest one snapshot inside another.
    fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Remove `name` and everything below it. Missing entries are an error.
    fn delete(&mut self, name: &str) -> Result<(), StoreError>;

    /// Create `name` as an empty directory, or refresh its modification time
    /// if it already exists.
    fn create_empty(&mut self, name: &str) -> Result<(), StoreError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        (**self).list()
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        (**self).exists(name)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        (**self).rename(from, to)
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        (**self).delete(name)
    }

    fn create_empty(&mut self, name: &str) -> Result<(), StoreError> {
        (**self).create_empty(name)
    }
}
