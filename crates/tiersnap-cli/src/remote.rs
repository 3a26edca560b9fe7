// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot store driven by shell commands, usually over ssh.
//!
//! Every operation is a single POSIX command line, so the remote side needs
//! nothing beyond coreutils. `mv -T` keeps a rename from landing inside an
//! existing directory.

use tiersnap_core::{Entry, SnapshotStore, StoreError};

use crate::listing::{list_command, parse_listing};
use crate::shell::{quote, Shell};

/// Snapshot root reached through a [`Shell`].
#[derive(Debug, Clone)]
pub struct ShellStore {
    shell: Shell,
    root: String,
}

impl ShellStore {
    /// Bind to `root` and make sure it exists.
    pub fn open(shell: Shell, root: impl Into<String>) -> Result<Self, StoreError> {
        let store = Self {
            shell,
            root: root.into(),
        };
        store.shell.run(&format!("mkdir -p {}", quote(&store.root)))?;
        Ok(store)
    }

    fn quoted(&self, name: &str) -> String {
        quote(&format!("{}/{name}", self.root))
    }

    fn test(&self, name: &str) -> Result<bool, StoreError> {
        let status = self
            .shell
            .output(&format!("test -e {}", self.quoted(name)))?
            .status;
        match status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(StoreError::Transport {
                command: self.shell.describe(&format!("test -e {}", self.quoted(name))),
                detail: status.to_string(),
            }),
        }
    }
}

impl SnapshotStore for ShellStore {
    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        let output = self.shell.run(&list_command(&quote(&self.root)))?;
        parse_listing(&output)
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        self.test(name)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        if !self.test(from)? {
            return Err(StoreError::NotFound(from.to_owned()));
        }
        if self.test(to)? {
            return Err(StoreError::Exists(to.to_owned()));
        }
        self.shell.run(&format!(
            "mv -T {} {}",
            self.quoted(from),
            self.quoted(to)
        ))?;
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        if !self.test(name)? {
            return Err(StoreError::NotFound(name.to_owned()));
        }
        self.shell.run(&format!("rm -rf {}", self.quoted(name)))?;
        Ok(())
    }

    fn create_empty(&mut self, name: &str) -> Result<(), StoreError> {
        let path = self.quoted(name);
        self.shell.run(&format!("mkdir -p {path} && touch {path}"))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    // `Shell::Local` runs the same command lines ssh would.
    fn store(dir: &tempfile::TempDir) -> ShellStore {
        ShellStore::open(Shell::Local, dir.path().join("snaps").display().to_string()).unwrap()
    }

    #[test]
    fn open_creates_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(dir.path().join("snaps").is_dir());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn operations_round_trip_through_the_shell() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.create_empty("hourly.00").unwrap();
        store.create_empty("hourly.01").unwrap();
        assert!(store.exists("hourly.00").unwrap());
        assert!(matches!(
            store.rename("hourly.00", "hourly.01"),
            Err(StoreError::Exists(_))
        ));
        store.rename("hourly.00", "hourly.02").unwrap();
        store.delete("hourly.01").unwrap();
        assert!(matches!(store.delete("hourly.01"), Err(StoreError::NotFound(_))));
        let names: Vec<_> = store.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["hourly.02"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_root_lists_the_linked_directory() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir_all(real.join("hourly.00")).unwrap();
        fs::create_dir_all(real.join("hourly.01")).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let store = ShellStore::open(Shell::Local, link.display().to_string()).unwrap();
        assert!(store.exists("hourly.01").unwrap());
        let mut names: Vec<_> = store.list().unwrap().into_iter().map(|e| e.name).collect();
        names.sort();
        assert_eq!(names, ["hourly.00", "hourly.01"]);
    }

    #[test]
    fn roots_with_spaces_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("my snaps");
        let mut store = ShellStore::open(Shell::Local, root.display().to_string()).unwrap();
        store.create_empty("daily.01").unwrap();
        assert!(root.join("daily.01").is_dir());
        fs::write(root.join("stray file"), b"").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
