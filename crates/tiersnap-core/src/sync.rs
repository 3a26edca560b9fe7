// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Staging of the next pending snapshot before rotation.

use tracing::info;

use crate::snapshot::SlotId;
use crate::store::{SnapshotStore, StoreError};
use crate::tier::Tier;

/// Copies data into a slot directory.
///
/// Implementations are the transfer half of a backend (e.g. `rsync` over
/// SSH). `reference`, when given, is an existing slot whose unchanged files
/// should be hard-linked instead of transferred again.
pub trait Transfer {
    /// Fill `target` from the backup source.
    fn transfer(&mut self, target: SlotId, reference: Option<SlotId>) -> Result<(), StoreError>;
}

/// How a sync run fills the finest tier.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SyncPlan {
    /// No committed snapshot yet: copy everything straight into slot 1.
    Full {
        /// Destination slot.
        target: SlotId,
    },
    /// Stage into the pending slot, linking unchanged files from `reference`.
    Incremental {
        /// Pending slot receiving the copy.
        target: SlotId,
        /// Newest committed slot.
        reference: SlotId,
    },
}

impl SyncPlan {
    /// Slot the transfer writes into.
    pub fn target(&self) -> SlotId {
        match self {
            SyncPlan::Full { target } | SyncPlan::Incremental { target, .. } => *target,
        }
    }
}

/// Decide between a first full copy and an incremental one.
pub fn plan_sync<S: SnapshotStore + ?Sized>(store: &S) -> Result<SyncPlan, StoreError> {
    let first = SlotId::new(Tier::FINEST, 1);
    if store.exists(&first.dir_name())? {
        Ok(SyncPlan::Incremental {
            target: SlotId::pending(Tier::FINEST),
            reference: first,
        })
    } else {
        Ok(SyncPlan::Full { target: first })
    }
}

/// Stage the next pending snapshot.
///
/// On incremental runs the pending slot is created (or its modification time
/// refreshed) before the transfer. Either way the target is stamped again
/// afterwards: archive-mode transfers copy the source directory's mtime, and
/// eligibility needs the slot to carry the time of this run.
pub fn sync<S, T>(store: &mut S, transfer: &mut T) -> Result<SyncPlan, StoreError>
where
    S: SnapshotStore + ?Sized,
    T: Transfer + ?Sized,
{
    let plan = plan_sync(store)?;
    match plan {
        SyncPlan::Full { target } => {
            info!(%target, "first run: full transfer");
            transfer.transfer(target, None)?;
        }
        SyncPlan::Incremental { target, reference } => {
            info!(%target, %reference, "incremental transfer");
            store.create_empty(&target.dir_name())?;
            transfer.transfer(target, Some(reference))?;
        }
    }
    store.create_empty(&plan.target().dir_name())?;
    Ok(plan)
}
