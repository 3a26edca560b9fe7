// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Free-space report for the filesystem holding the snapshots (`df -Pk`).

use serde::Serialize;
use tiersnap_core::StoreError;

use crate::shell::{quote, Shell};

/// One `df -Pk` row. Sizes are in KiB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    /// Device or filesystem name.
    pub filesystem: String,
    /// Total size.
    pub total_kib: u64,
    /// Space in use.
    pub used_kib: u64,
    /// Space available to unprivileged users.
    pub available_kib: u64,
    /// Mount point.
    pub mounted_on: String,
}

impl DiskUsage {
    /// Share of the filesystem in use, rounded up like `df` does.
    pub fn used_percent(&self) -> u64 {
        let usable = self.used_kib + self.available_kib;
        if usable == 0 {
            return 0;
        }
        (self.used_kib * 100).div_ceil(usable)
    }

    /// Query the filesystem containing `path` through `shell`.
    pub fn query(shell: &Shell, path: &str) -> Result<Self, StoreError> {
        let output = shell.run(&format!("df -Pk {}", quote(path)))?;
        Self::parse(&output)
    }

    /// Parse `df -Pk` output for a single path.
    pub fn parse(output: &str) -> Result<Self, StoreError> {
        let row = output
            .lines()
            .skip(1)
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| StoreError::Malformed("df printed no data row".into()))?;
        let mut fields = row.split_whitespace();
        let mut next = |what: &str| {
            fields
                .next()
                .ok_or_else(|| StoreError::Malformed(format!("df row lacks {what}: `{row}`")))
        };
        let filesystem = next("filesystem")?.to_owned();
        let mut size = |what: &str| -> Result<u64, StoreError> {
            let raw = next(what)?;
            raw.parse()
                .map_err(|_| StoreError::Malformed(format!("df {what} `{raw}` is not a number")))
        };
        let total_kib = size("size")?;
        let used_kib = size("used")?;
        let available_kib = size("available")?;
        let _capacity = next("capacity")?;
        let mounted_on = fields.collect::<Vec<_>>().join(" ");
        if mounted_on.is_empty() {
            return Err(StoreError::Malformed(format!("df row lacks mount point: `{row}`")));
        }
        Ok(Self {
            filesystem,
            total_kib,
            used_kib,
            available_kib,
            mounted_on,
        })
    }
}
