// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Eligibility test and the per-tier rotation planner.
//!
//! Planning is pure: [`plan_tier`] looks at a [`SnapshotCollection`] and
//! returns the ordered [`StorageOp`]s that rotate one tier. Executing them is
//! the engine's job.
//!
//! Eligibility rule
//! - No members, or no slot 0 among at least two members: not ready.
//! - A lone member is ready iff it is slot 0.
//! - Otherwise slot 0 (the candidate) is ready iff
//!   `candidate - 1 unit(tier) + 1 unit(tier below) >= leader`, where the
//!   leader is the next member in index order. The finer unit is a tolerance
//!   window: runs that fire a little early still roll on schedule.
//!
//! Rotation of a ready tier
//! 1. Delete every member past the first `limit + 1` (overflow).
//! 2. Choose where the oldest kept member goes: slot 0 of the next tier when
//!    full and a next tier exists; nowhere (deleted) when full at the end of
//!    the chain; otherwise a new slot one past the last index.
//! 3. Shift every kept member one position along that chain, renaming from
//!    the oldest end so no slot is overwritten before it has moved.
//!
//! A tier that is not ready and is not the finest tier drops a leftover slot 0
//! from an interrupted run, so it cannot block the next promotion.

use std::fmt;

use time::OffsetDateTime;

use crate::calendar;
use crate::collection::SnapshotCollection;
use crate::snapshot::{SlotId, Snapshot};
use crate::tier::Tier;

/// Why a tier is or is not ready to rotate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Readiness {
    /// The tier is disabled by policy.
    Disabled,
    /// The tier holds nothing.
    Empty,
    /// The tier holds members but none in slot 0.
    NoPending,
    /// The only member is slot 0.
    LonePending,
    /// Slot 0 is far enough ahead of its leader.
    Due,
    /// Slot 0 is too close to its leader.
    NotDue,
}

impl Readiness {
    /// Whether the tier should rotate.
    pub fn is_eligible(self) -> bool {
        matches!(self, Readiness::LonePending | Readiness::Due)
    }
}

/// Classify `tier` within `collection`.
pub fn readiness(collection: &SnapshotCollection, tier: Tier) -> Readiness {
    let policy = collection.policy();
    if !policy.is_enabled(tier) {
        return Readiness::Disabled;
    }
    match collection.filter(tier) {
        [] => Readiness::Empty,
        [only] if only.is_pending() => Readiness::LonePending,
        [candidate, leader, ..] if candidate.is_pending() => {
            let shift = calendar::tolerance(policy.spacing(tier), policy.finer_spacing(tier));
            if is_due(shift.apply(candidate.timestamp), leader) {
                Readiness::Due
            } else {
                Readiness::NotDue
            }
        }
        _ => Readiness::NoPending,
    }
}

fn is_due(threshold: Option<OffsetDateTime>, leader: &Snapshot) -> bool {
    threshold.is_some_and(|threshold| threshold >= leader.timestamp)
}

/// Whether `tier` is ready to rotate.
pub fn is_eligible(collection: &SnapshotCollection, tier: Tier) -> bool {
    readiness(collection, tier).is_eligible()
}

/// One primitive storage mutation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StorageOp {
    /// Remove a slot and its contents.
    Delete(SlotId),
    /// Move a slot to a free name.
    Rename {
        /// Source slot.
        from: SlotId,
        /// Destination slot; free at the time the op runs.
        to: SlotId,
    },
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageOp::Delete(slot) => write!(f, "delete {slot}"),
            StorageOp::Rename { from, to } => write!(f, "rename {from} -> {to}"),
        }
    }
}

/// What a tier step decided.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TierOutcome {
    /// The oldest member moved into the next tier's pending slot.
    Promoted {
        /// Slot the promoted member occupied.
        from: SlotId,
        /// Pending slot of the next tier.
        into: SlotId,
    },
    /// Full at the end of the chain: the oldest member was dropped.
    Capped {
        /// Slot that was deleted.
        dropped: SlotId,
    },
    /// Room was left: members shifted into a newly allocated slot.
    Extended {
        /// The new highest slot.
        slot: SlotId,
    },
    /// Not ready; a leftover pending slot was removed.
    PurgedDebris,
    /// Nothing to do.
    Skipped(Readiness),
}

/// Planned rotation of one tier.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierPlan {
    /// Tier the plan applies to.
    pub tier: Tier,
    /// Classification the plan was based on.
    pub readiness: Readiness,
    /// Decision taken.
    pub outcome: TierOutcome,
    /// Operations in execution order.
    pub ops: Vec<StorageOp>,
}

impl TierPlan {
    fn skipped(tier: Tier, readiness: Readiness) -> Self {
        Self {
            tier,
            readiness,
            outcome: TierOutcome::Skipped(readiness),
            ops: Vec::new(),
        }
    }

    /// Whether executing the plan changes storage.
    pub fn is_noop(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Plan the rotation of `tier`.
///
/// The finest tier's pending slot is never treated as debris: it is where
/// sync stages the next snapshot.
pub fn plan_tier(collection: &SnapshotCollection, tier: Tier) -> TierPlan {
    let policy = collection.policy();
    let readiness = readiness(collection, tier);
    let pending = SlotId::pending(tier);

    if !readiness.is_eligible() {
        if tier != Tier::FINEST && collection.contains(pending) {
            return TierPlan {
                tier,
                readiness,
                outcome: TierOutcome::PurgedDebris,
                ops: vec![StorageOp::Delete(pending)],
            };
        }
        return TierPlan::skipped(tier, readiness);
    }

    let members = collection.filter(tier);
    let excess = collection.excess(tier);
    let kept = &members[..members.len() - excess.len()];
    let mut ops: Vec<StorageOp> = excess.iter().map(|s| StorageOp::Delete(s.id)).collect();
    let mut chain: Vec<SlotId> = kept.iter().map(|s| s.id).collect();
    let Some(&oldest) = chain.last() else {
        return TierPlan::skipped(tier, readiness);
    };

    let outcome = match (collection.is_full(tier), policy.next_tier(tier)) {
        (true, Some(next)) => {
            let into = SlotId::pending(next);
            // A pending slot the next tier never got to process is superseded
            // by this fresher promotion.
            if collection.contains(into) {
                ops.push(StorageOp::Delete(into));
            }
            chain.push(into);
            TierOutcome::Promoted { from: oldest, into }
        }
        (true, None) => {
            ops.push(StorageOp::Delete(oldest));
            TierOutcome::Capped { dropped: oldest }
        }
        (false, _) => {
            // No slot left above the oldest member.
            let Some(index) = oldest.index.checked_add(1) else {
                return TierPlan::skipped(tier, readiness);
            };
            let slot = SlotId::new(tier, index);
            chain.push(slot);
            TierOutcome::Extended { slot }
        }
    };

    ops.extend(
        chain
            .windows(2)
            .rev()
            .map(|pair| StorageOp::Rename {
                from: pair[0],
                to: pair[1],
            }),
    );

    TierPlan {
        tier,
        readiness,
        outcome,
        ops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyTable;
    use time::macros::datetime;
    use time::Duration;

    const NOW: OffsetDateTime = datetime!(2024-06-15 12:00 UTC);

    fn collection(snaps: &[(Tier, u32, OffsetDateTime)], policy: PolicyTable) -> SnapshotCollection {
        SnapshotCollection::new(
            snaps.iter().map(|&(tier, index, at)| Snapshot::new(tier, index, at)),
            policy,
        )
    }

    fn renames(plan: &TierPlan) -> Vec<String> {
        plan.ops.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_tier_is_not_ready() {
        let c = collection(&[], PolicyTable::default());
        assert_eq!(readiness(&c, Tier::Hourly), Readiness::Empty);
    }

    #[test]
    fn lone_pending_is_always_ready() {
        let c = collection(&[(Tier::Weekly, 0, NOW)], PolicyTable::default());
        assert_eq!(readiness(&c, Tier::Weekly), Readiness::LonePending);
    }

    #[test]
    fn lone_committed_member_is_never_ready() {
        let c = collection(&[(Tier::Monthly, 1, NOW)], PolicyTable::default());
        assert_eq!(readiness(&c, Tier::Monthly), Readiness::NoPending);
    }

    #[test]
    fn members_without_pending_are_not_ready() {
        let c = collection(
            &[(Tier::Daily, 1, NOW), (Tier::Daily, 2, NOW - Duration::days(1))],
            PolicyTable::default(),
        );
        assert_eq!(readiness(&c, Tier::Daily), Readiness::NoPending);
    }

    #[test]
    fn jitter_within_one_finer_unit_still_rotates() {
        let early = NOW - Duration::hours(1) + Duration::seconds(30);
        let c = collection(
            &[(Tier::Hourly, 0, NOW), (Tier::Hourly, 1, early)],
            PolicyTable::default(),
        );
        assert_eq!(readiness(&c, Tier::Hourly), Readiness::Due);
    }

    #[test]
    fn half_a_unit_is_not_enough() {
        let c = collection(
            &[(Tier::Hourly, 0, NOW), (Tier::Hourly, 1, NOW - Duration::minutes(30))],
            PolicyTable::default(),
        );
        assert_eq!(readiness(&c, Tier::Hourly), Readiness::NotDue);
    }

    #[test]
    fn threshold_is_inclusive() {
        // Exactly 59 minutes is the boundary for the hourly tier.
        let c = collection(
            &[(Tier::Hourly, 0, NOW), (Tier::Hourly, 1, NOW - Duration::minutes(59))],
            PolicyTable::default(),
        );
        assert!(is_eligible(&c, Tier::Hourly));
    }

    #[test]
    fn disabled_tier_reports_disabled() {
        let policy = PolicyTable::default().with_limit(Tier::Yearly, 0);
        let c = collection(&[(Tier::Yearly, 0, NOW)], policy);
        assert_eq!(readiness(&c, Tier::Yearly), Readiness::Disabled);
        let plan = plan_tier(&c, Tier::Yearly);
        assert_eq!(plan.outcome, TierOutcome::PurgedDebris);
        assert_eq!(renames(&plan), ["delete yearly.00"]);
    }

    #[test]
    fn extend_shifts_into_a_new_slot_highest_first() {
        let c = collection(
            &[
                (Tier::Hourly, 0, NOW),
                (Tier::Hourly, 1, NOW - Duration::hours(1)),
                (Tier::Hourly, 2, NOW - Duration::hours(2)),
            ],
            PolicyTable::default(),
        );
        let plan = plan_tier(&c, Tier::Hourly);
        assert_eq!(
            plan.outcome,
            TierOutcome::Extended {
                slot: SlotId::new(Tier::Hourly, 3)
            }
        );
        assert_eq!(
            renames(&plan),
            [
                "rename hourly.02 -> hourly.03",
                "rename hourly.01 -> hourly.02",
                "rename hourly.00 -> hourly.01",
            ]
        );
    }

    #[test]
    fn full_tier_promotes_its_oldest_member() {
        let policy = PolicyTable::default().with_limit(Tier::Hourly, 2);
        let c = collection(
            &[
                (Tier::Hourly, 0, NOW),
                (Tier::Hourly, 1, NOW - Duration::hours(1)),
                (Tier::Hourly, 2, NOW - Duration::hours(2)),
            ],
            policy,
        );
        let plan = plan_tier(&c, Tier::Hourly);
        assert_eq!(
            plan.outcome,
            TierOutcome::Promoted {
                from: SlotId::new(Tier::Hourly, 2),
                into: SlotId::pending(Tier::Daily),
            }
        );
        assert_eq!(
            renames(&plan),
            [
                "rename hourly.02 -> daily.00",
                "rename hourly.01 -> hourly.02",
                "rename hourly.00 -> hourly.01",
            ]
        );
    }

    #[test]
    fn full_tier_at_end_of_chain_drops_its_oldest_member() {
        let policy = PolicyTable::default().with_limit(Tier::Weekly, 2).with_limit(Tier::Monthly, 0);
        let c = collection(
            &[
                (Tier::Weekly, 0, NOW),
                (Tier::Weekly, 1, NOW - Duration::weeks(1)),
                (Tier::Weekly, 2, NOW - Duration::weeks(2)),
            ],
            policy,
        );
        let plan = plan_tier(&c, Tier::Weekly);
        assert_eq!(
            plan.outcome,
            TierOutcome::Capped {
                dropped: SlotId::new(Tier::Weekly, 2)
            }
        );
        assert_eq!(
            renames(&plan),
            [
                "delete weekly.02",
                "rename weekly.01 -> weekly.02",
                "rename weekly.00 -> weekly.01",
            ]
        );
    }

    #[test]
    fn overflow_is_purged_before_shifting() {
        let policy = PolicyTable::default().with_limit(Tier::Daily, 2);
        let snaps: Vec<_> = (0..5)
            .map(|i| (Tier::Daily, i, NOW - Duration::days(i64::from(i))))
            .collect();
        let plan = plan_tier(&collection(&snaps, policy), Tier::Daily);
        assert_eq!(
            renames(&plan),
            [
                "delete daily.03",
                "delete daily.04",
                "rename daily.02 -> weekly.00",
                "rename daily.01 -> daily.02",
                "rename daily.00 -> daily.01",
            ]
        );
    }

    #[test]
    fn gap_allocates_one_past_the_last_index() {
        let c = collection(
            &[(Tier::Daily, 0, NOW), (Tier::Daily, 5, NOW - Duration::days(5))],
            PolicyTable::default(),
        );
        let plan = plan_tier(&c, Tier::Daily);
        assert_eq!(
            plan.outcome,
            TierOutcome::Extended {
                slot: SlotId::new(Tier::Daily, 6)
            }
        );
        assert_eq!(
            renames(&plan),
            ["rename daily.05 -> daily.06", "rename daily.00 -> daily.05"]
        );
    }

    #[test]
    fn stale_pending_in_next_tier_is_superseded() {
        let policy = PolicyTable::default().with_limit(Tier::Hourly, 1);
        let c = collection(
            &[
                (Tier::Hourly, 0, NOW),
                (Tier::Hourly, 1, NOW - Duration::hours(1)),
                (Tier::Daily, 0, NOW - Duration::hours(2)),
            ],
            policy,
        );
        let plan = plan_tier(&c, Tier::Hourly);
        assert_eq!(
            renames(&plan),
            [
                "delete daily.00",
                "rename hourly.01 -> daily.00",
                "rename hourly.00 -> hourly.01",
            ]
        );
    }

    #[test]
    fn not_due_tier_drops_leftover_pending() {
        let c = collection(
            &[(Tier::Daily, 0, NOW), (Tier::Daily, 1, NOW - Duration::hours(3))],
            PolicyTable::default(),
        );
        let plan = plan_tier(&c, Tier::Daily);
        assert_eq!(plan.readiness, Readiness::NotDue);
        assert_eq!(plan.outcome, TierOutcome::PurgedDebris);
        assert_eq!(renames(&plan), ["delete daily.00"]);
    }

    #[test]
    fn not_due_finest_tier_keeps_its_pending_slot() {
        let c = collection(
            &[(Tier::Hourly, 0, NOW), (Tier::Hourly, 1, NOW - Duration::minutes(10))],
            PolicyTable::default(),
        );
        let plan = plan_tier(&c, Tier::Hourly);
        assert_eq!(plan.outcome, TierOutcome::Skipped(Readiness::NotDue));
        assert!(plan.is_noop());
    }

    #[test]
    fn exhausted_index_space_is_left_alone() {
        let c = collection(
            &[(Tier::Hourly, 0, NOW), (Tier::Hourly, u32::MAX, NOW - Duration::hours(2))],
            PolicyTable::default(),
        );
        let plan = plan_tier(&c, Tier::Hourly);
        assert_eq!(plan.readiness, Readiness::Due);
        assert_eq!(plan.outcome, TierOutcome::Skipped(Readiness::Due));
        assert!(plan.is_noop());
    }
}
