// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot store on a local directory, driven through `std::fs`.

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use time::OffsetDateTime;
use tiersnap_core::{Entry, SnapshotStore, StoreError};

/// Snapshot root on this machine. Timestamps are directory mtimes.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open `root`, creating it if it does not exist yet.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            op: "create",
            name: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn io_err<'a>(op: &'static str, name: &'a str) -> impl FnOnce(io::Error) -> StoreError + 'a {
    move |source| match source.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(name.to_owned()),
        _ => StoreError::Io {
            op,
            name: name.to_owned(),
            source,
        },
    }
}

impl SnapshotStore for LocalStore {
    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        let root = self.root.display().to_string();
        let mut entries = Vec::new();
        for dirent in fs::read_dir(&self.root).map_err(io_err("list", &root))? {
            let dirent = dirent.map_err(io_err("list", &root))?;
            let meta = dirent.metadata().map_err(io_err("stat", &root))?;
            if !meta.is_dir() {
                continue;
            }
            let Ok(name) = dirent.file_name().into_string() else {
                continue;
            };
            let modified = meta.modified().map_err(io_err("stat", &name))?;
            entries.push(Entry::new(name, OffsetDateTime::from(modified)));
        }
        Ok(entries)
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        self.path(name).try_exists().map_err(io_err("stat", name))
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        if self.exists(to)? {
            return Err(StoreError::Exists(to.to_owned()));
        }
        fs::rename(self.path(from), self.path(to)).map_err(io_err("rename", from))
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        fs::remove_dir_all(self.path(name)).map_err(io_err("delete", name))
    }

    fn create_empty(&mut self, name: &str) -> Result<(), StoreError> {
        let path = self.path(name);
        fs::create_dir_all(&path).map_err(io_err("create", name))?;
        File::open(&path)
            .and_then(|dir| dir.set_modified(SystemTime::now()))
            .map_err(io_err("touch", name))
    }
}
