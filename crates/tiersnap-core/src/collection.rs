// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Frozen, layout-ordered set of snapshot records.

use crate::policy::PolicyTable;
use crate::snapshot::{SlotId, Snapshot};
use crate::tier::Tier;

/// All snapshots known at one point of a run, plus the policy they are judged
/// against.
///
/// Records are sorted by [`Snapshot::layout_cmp`] on construction, so each
/// tier's members form one contiguous, index-ordered run and
/// [`filter`](SnapshotCollection::filter) can hand out a slice.
///
/// Slot indices are unique within a tier as long as records come from
/// canonical directory names; [`SlotId`](crate::SlotId) parsing rejects
/// zero-padded aliases such as `hourly.001`.
#[derive(Clone, Debug)]
pub struct SnapshotCollection {
    snapshots: Vec<Snapshot>,
    policy: PolicyTable,
}

impl SnapshotCollection {
    /// Sort and freeze `snapshots` under `policy`.
    pub fn new<I>(snapshots: I, policy: PolicyTable) -> Self
    where
        I: IntoIterator<Item = Snapshot>,
    {
        let mut snapshots: Vec<Snapshot> = snapshots.into_iter().collect();
        snapshots.sort_by(Snapshot::layout_cmp);
        Self { snapshots, policy }
    }

    /// Retention policy this collection is judged against.
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Every record, in layout order.
    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns `true` if no records are held.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Members of `tier`, in index order.
    pub fn filter(&self, tier: Tier) -> &[Snapshot] {
        let start = self
            .snapshots
            .partition_point(|s| s.tier().rank() < tier.rank());
        let end = self
            .snapshots
            .partition_point(|s| s.tier().rank() <= tier.rank());
        &self.snapshots[start..end]
    }

    /// Number of members of `tier`.
    pub fn count(&self, tier: Tier) -> usize {
        self.filter(tier).len()
    }

    /// `true` once the tier holds more members than its limit, i.e. the pending
    /// slot has nowhere to go without displacing the oldest member.
    pub fn is_full(&self, tier: Tier) -> bool {
        self.count(tier) > self.policy.limit(tier)
    }

    /// Members past the first `limit + 1` in index order: overflow that a
    /// rotation purges outright.
    pub fn excess(&self, tier: Tier) -> &[Snapshot] {
        let members = self.filter(tier);
        let keep = self.policy.limit(tier).saturating_add(1);
        members.get(keep..).unwrap_or_default()
    }

    /// Look up a record by identity.
    pub fn get(&self, id: SlotId) -> Option<&Snapshot> {
        self.filter(id.tier).iter().find(|s| s.id == id)
    }

    /// Whether a record with this identity is present.
    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }
}

impl<'a> IntoIterator for &'a SnapshotCollection {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    const NOW: OffsetDateTime = datetime!(2024-06-15 12:00 UTC);

    fn snap(tier: Tier, index: u32) -> Snapshot {
        Snapshot::new(tier, index, NOW - Duration::hours(i64::from(index)))
    }

    #[test]
    fn filter_returns_only_that_tier_in_index_order() {
        let collection = SnapshotCollection::new(
            [
                snap(Tier::Weekly, 0),
                snap(Tier::Daily, 3),
                snap(Tier::Daily, 1),
                snap(Tier::Hourly, 0),
            ],
            PolicyTable::default(),
        );
        let dailies: Vec<u32> = collection
            .filter(Tier::Daily)
            .iter()
            .map(Snapshot::index)
            .collect();
        assert_eq!(dailies, [1, 3]);
        assert_eq!(collection.count(Tier::Weekly), 1);
        assert!(collection.filter(Tier::Yearly).is_empty());
        assert_eq!(collection.len(), 4);
    }

    #[test]
    fn full_means_more_than_limit() {
        let policy = PolicyTable::default().with_limit(Tier::Daily, 3);
        let three = SnapshotCollection::new((0..3).map(|i| snap(Tier::Daily, i)), policy.clone());
        assert!(!three.is_full(Tier::Daily));
        let four = SnapshotCollection::new((0..4).map(|i| snap(Tier::Daily, i)), policy);
        assert!(four.is_full(Tier::Daily));
        assert!(four.excess(Tier::Daily).is_empty());
    }

    #[test]
    fn excess_is_everything_past_limit_plus_one() {
        let policy = PolicyTable::default().with_limit(Tier::Weekly, 2);
        let collection = SnapshotCollection::new((0..6).map(|i| snap(Tier::Weekly, i)), policy);
        let excess: Vec<u32> = collection
            .excess(Tier::Weekly)
            .iter()
            .map(Snapshot::index)
            .collect();
        assert_eq!(excess, [3, 4, 5]);
    }

    #[test]
    fn gap_does_not_make_a_tier_full() {
        let collection = SnapshotCollection::new(
            [snap(Tier::Daily, 0), snap(Tier::Daily, 5)],
            PolicyTable::default(),
        );
        assert!(!collection.is_full(Tier::Daily));
        assert!(collection.contains(SlotId::new(Tier::Daily, 5)));
        assert!(!collection.contains(SlotId::new(Tier::Daily, 6)));
    }
}
