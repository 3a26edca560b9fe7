// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `rsync` transfer from a local source directory into a snapshot slot.

use std::path::PathBuf;
use std::process::Command;

use tiersnap_core::{SlotId, StoreError, Transfer};
use tracing::debug;

use crate::target::Target;

/// Pushes a source tree into slots under a [`Target`].
#[derive(Debug, Clone)]
pub struct RsyncTransfer {
    source: PathBuf,
    target: Target,
    delete: bool,
    excludes: Vec<String>,
    program: String,
}

impl RsyncTransfer {
    /// Transfer `source` into slots under `target`.
    pub fn new(source: impl Into<PathBuf>, target: Target) -> Self {
        Self {
            source: source.into(),
            target,
            delete: true,
            excludes: Vec::new(),
            program: "rsync".into(),
        }
    }

    /// Whether files gone from the source are removed from the slot.
    #[must_use]
    pub fn delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    /// Add `--exclude` patterns.
    #[must_use]
    pub fn excludes(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.excludes.extend(patterns);
        self
    }

    /// Use a different rsync binary.
    #[must_use]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Argument vector for one transfer.
    ///
    /// The link reference is relative, so rsync resolves it against the
    /// destination slot on whichever host holds it.
    pub fn args(&self, slot: SlotId, reference: Option<SlotId>) -> Vec<String> {
        let mut args = vec!["-az".to_owned()];
        if self.delete {
            args.push("--delete".into());
        }
        args.extend(self.excludes.iter().map(|pattern| format!("--exclude={pattern}")));
        if let Some(reference) = reference {
            args.push(format!("--link-dest=../{reference}"));
        }
        let mut source = self.source.display().to_string();
        if !source.ends_with('/') {
            source.push('/');
        }
        args.push(source);
        args.push(format!("{}/{slot}/", self.target.rsync_root()));
        args
    }
}

impl Transfer for RsyncTransfer {
    fn transfer(&mut self, target: SlotId, reference: Option<SlotId>) -> Result<(), StoreError> {
        let args = self.args(target, reference);
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(%command, "starting transfer");
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|err| StoreError::Transport {
                command: command.clone(),
                detail: err.to_string(),
            })?;
        if !status.success() {
            return Err(StoreError::Transport {
                command,
                detail: status.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shell::quote;
    use tiersnap_core::Tier;

    fn remote() -> Target {
        "nas:/srv/snaps".parse().unwrap()
    }

    #[test]
    fn first_run_copies_without_a_reference() {
        let rsync = RsyncTransfer::new("/home/me", remote());
        assert_eq!(
            rsync.args(SlotId::new(Tier::Hourly, 1), None),
            ["-az", "--delete", "/home/me/", "nas:/srv/snaps/hourly.01/"]
        );
    }

    #[test]
    fn incremental_runs_link_against_the_newest_slot() {
        let rsync = RsyncTransfer::new("/home/me/", remote())
            .delete(false)
            .excludes(vec![".cache".to_owned(), "*.tmp".to_owned()]);
        assert_eq!(
            rsync.args(SlotId::pending(Tier::Hourly), Some(SlotId::new(Tier::Hourly, 1))),
            [
                "-az",
                "--exclude=.cache",
                "--exclude=*.tmp",
                "--link-dest=../hourly.01",
                "/home/me/",
                "nas:/srv/snaps/hourly.00/",
            ]
        );
    }

    #[test]
    fn home_relative_targets_share_the_store_root() {
        let target: Target = "nas:~/snaps".parse().unwrap();
        let Target::Remote { path, .. } = &target else {
            unreachable!("parsed as remote");
        };
        // The shell store addresses `<quoted root>/<slot>` from the login directory.
        let store_root = quote(path);
        assert_eq!(store_root, "snaps");
        let rsync = RsyncTransfer::new("/home/me", target.clone());
        let dest = rsync.args(SlotId::new(Tier::Hourly, 1), None).pop().unwrap();
        assert_eq!(dest, format!("nas:{store_root}/hourly.01/"));
    }

    #[test]
    fn failing_program_is_a_transport_error() {
        let mut rsync = RsyncTransfer::new("/nonexistent", remote()).program("false");
        let err = rsync.transfer(SlotId::new(Tier::Hourly, 1), None).unwrap_err();
        assert!(matches!(err, StoreError::Transport { ref command, .. } if command.starts_with("false -az")));
    }
}
