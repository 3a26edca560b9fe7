// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cascading rotation over a [`SnapshotStore`].
//!
//! The cascade is an iterative walk: every tier on the policy chain gets a
//! step, win or lose, finest first. Each step re-lists the store so it sees
//! what the previous step promoted. Because every run re-attempts every tier,
//! a run that dies half way through is finished off by the next one.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collection::SnapshotCollection;
use crate::memory::MemoryStore;
use crate::policy::PolicyTable;
use crate::rotation::{plan_tier, StorageOp, TierOutcome, TierPlan};
use crate::snapshot::Snapshot;
use crate::store::{Entry, SnapshotStore, StoreError};
use crate::tier::Tier;

/// Failure of a rotation run.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The store could not be listed.
    #[error("[ROTATE_LIST] listing snapshots before {tier}: {source}")]
    List {
        /// Tier about to be rotated.
        tier: Tier,
        /// Underlying failure.
        #[source]
        source: StoreError,
    },
    /// A planned operation failed; later operations and tiers were not run.
    #[error("[ROTATE_OP] {tier}: {op} failed: {source}")]
    Op {
        /// Tier being rotated.
        tier: Tier,
        /// Operation that failed.
        op: StorageOp,
        /// Underlying failure.
        #[source]
        source: StoreError,
    },
}

/// Everything a run did (or, for a dry run, would do), tier by tier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotationReport {
    /// One entry per visited tier, in visiting order.
    pub tiers: Vec<TierPlan>,
}

impl RotationReport {
    /// Whether any storage operation was issued.
    pub fn changed(&self) -> bool {
        self.tiers.iter().any(|plan| !plan.is_noop())
    }

    /// All operations, in execution order.
    pub fn ops(&self) -> impl Iterator<Item = &StorageOp> {
        self.tiers.iter().flat_map(|plan| plan.ops.iter())
    }
}

/// Turn a listing into snapshot records, ignoring foreign names.
pub fn collect(entries: Vec<Entry>, policy: &PolicyTable) -> SnapshotCollection {
    let snapshots = entries.into_iter().filter_map(|entry| {
        match Snapshot::from_dir_name(&entry.name, entry.modified) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                debug!(name = %entry.name, %err, "ignoring non-snapshot entry");
                None
            }
        }
    });
    SnapshotCollection::new(snapshots, policy.clone())
}

/// Rotation engine bound to one store and one policy.
pub struct Engine<'a, S: SnapshotStore + ?Sized> {
    store: &'a mut S,
    policy: PolicyTable,
}

impl<'a, S: SnapshotStore + ?Sized> Engine<'a, S> {
    /// Bind an engine to `store`.
    pub fn new(store: &'a mut S, policy: PolicyTable) -> Self {
        Self { store, policy }
    }

    /// Policy in force.
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Current state of the store as a collection.
    pub fn snapshots(&self) -> Result<SnapshotCollection, StoreError> {
        Ok(collect(self.store.list()?, &self.policy))
    }

    /// Tiers a run visits: the promotion chain, then every disabled tier
    /// (other than the finest) so stray pending slots there get cleaned up.
    pub fn walk(&self) -> Vec<Tier> {
        let mut tiers = self.policy.chain();
        tiers.extend(
            Tier::ALL
                .into_iter()
                .filter(|&tier| tier != Tier::FINEST && !self.policy.is_enabled(tier)),
        );
        tiers
    }

    /// Plan and execute one tier step.
    pub fn rotate_tier(&mut self, tier: Tier) -> Result<TierPlan, RotationError> {
        let collection = self
            .snapshots()
            .map_err(|source| RotationError::List { tier, source })?;
        let plan = plan_tier(&collection, tier);
        for op in &plan.ops {
            debug!(%tier, %op, "applying");
            self.apply(*op)
                .map_err(|source| RotationError::Op { tier, op: *op, source })?;
        }
        match plan.outcome {
            TierOutcome::Promoted { from, into } => info!(%tier, %from, %into, "promoted"),
            TierOutcome::Capped { dropped } => info!(%tier, %dropped, "dropped oldest at end of chain"),
            TierOutcome::Extended { slot } => info!(%tier, %slot, "rotated into new slot"),
            TierOutcome::PurgedDebris => {
                warn!(%tier, readiness = ?plan.readiness, "removed leftover pending slot");
            }
            TierOutcome::Skipped(readiness) => debug!(%tier, ?readiness, "nothing to rotate"),
        }
        Ok(plan)
    }

    /// Run the full cascade. Stops at the first failing operation.
    pub fn rotate(&mut self) -> Result<RotationReport, RotationError> {
        let mut report = RotationReport::default();
        if self.policy.retains_nothing() {
            debug!("every tier disabled; rotation is a no-op");
            return Ok(report);
        }
        for tier in self.walk() {
            report.tiers.push(self.rotate_tier(tier)?);
        }
        Ok(report)
    }

    fn apply(&mut self, op: StorageOp) -> Result<(), StoreError> {
        match op {
            StorageOp::Delete(slot) => self.store.delete(&slot.dir_name()),
            StorageOp::Rename { from, to } => {
                self.store.rename(&from.dir_name(), &to.dir_name())
            }
        }
    }
}

/// Compute what a rotation would do without touching `store`.
///
/// The listing is copied into a [`MemoryStore`] and the cascade is played
/// against the copy, so later tiers see the effect of earlier ones exactly as
/// a real run would.
pub fn dry_run<S: SnapshotStore + ?Sized>(
    store: &S,
    policy: &PolicyTable,
) -> Result<RotationReport, RotationError> {
    let entries = store.list().map_err(|source| RotationError::List {
        tier: Tier::FINEST,
        source,
    })?;
    let now = entries
        .iter()
        .map(|entry| entry.modified)
        .max()
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);
    let mut scratch = MemoryStore::from_entries(entries, now);
    Engine::new(&mut scratch, policy.clone()).rotate()
}
