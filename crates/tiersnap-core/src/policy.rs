// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-tier retention policy.

use crate::tier::{SpacingUnit, Tier};

/// Default limits, finest first: a day of hourlies, a week of dailies, a month
/// of weeklies, a year and a month of monthlies, four yearlies.
pub const DEFAULT_LIMITS: [usize; 5] = [24, 7, 4, 13, 4];

/// Retention policy for one tier.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierPolicy {
    /// Maximum number of committed slots. `0` disables the tier and ends the
    /// chain there.
    pub limit: usize,
    /// Calendar distance expected between neighbouring slots.
    pub spacing: SpacingUnit,
}

impl TierPolicy {
    /// Whether the tier retains anything at all.
    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }
}

/// Explicit `Tier -> TierPolicy` mapping.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolicyTable {
    policies: [TierPolicy; 5],
}

impl PolicyTable {
    /// Build a table from five limits (finest first) with each tier's default
    /// spacing.
    pub fn from_limits(limits: [usize; 5]) -> Self {
        let mut policies = Tier::ALL.map(|tier| TierPolicy {
            limit: 0,
            spacing: tier.default_spacing(),
        });
        for (policy, limit) in policies.iter_mut().zip(limits) {
            policy.limit = limit;
        }
        Self { policies }
    }

    /// Replace the limit for one tier.
    pub fn with_limit(mut self, tier: Tier, limit: usize) -> Self {
        self.policies[tier.rank()].limit = limit;
        self
    }

    /// Replace the spacing unit for one tier.
    pub fn with_spacing(mut self, tier: Tier, spacing: SpacingUnit) -> Self {
        self.policies[tier.rank()].spacing = spacing;
        self
    }

    /// Policy for `tier`.
    pub fn policy(&self, tier: Tier) -> TierPolicy {
        self.policies[tier.rank()]
    }

    /// Maximum committed slots for `tier`.
    pub fn limit(&self, tier: Tier) -> usize {
        self.policy(tier).limit
    }

    /// Spacing unit for `tier`.
    pub fn spacing(&self, tier: Tier) -> SpacingUnit {
        self.policy(tier).spacing
    }

    /// Limits in tier order.
    pub fn limits(&self) -> [usize; 5] {
        self.policies.map(|p| p.limit)
    }

    /// Spacing of the tier below `tier`; below the finest tier this is one
    /// unit finer than its own spacing.
    pub fn finer_spacing(&self, tier: Tier) -> SpacingUnit {
        match tier.finer() {
            Some(finer) => self.spacing(finer),
            None => self.spacing(tier).finer(),
        }
    }

    /// Whether `tier` retains anything.
    pub fn is_enabled(&self, tier: Tier) -> bool {
        self.policy(tier).is_enabled()
    }

    /// The next coarser tier, if it exists and is enabled. `None` marks the end
    /// of the chain: that tier caps its own overflow instead of promoting.
    pub fn next_tier(&self, tier: Tier) -> Option<Tier> {
        tier.coarser().filter(|next| self.is_enabled(*next))
    }

    /// Tiers reachable by promotion, finest first. Empty when the finest tier
    /// is disabled.
    pub fn chain(&self) -> Vec<Tier> {
        let mut chain = Vec::new();
        let mut cursor = Some(Tier::FINEST).filter(|t| self.is_enabled(*t));
        while let Some(tier) = cursor {
            chain.push(tier);
            cursor = self.next_tier(tier);
        }
        chain
    }

    /// Whether nothing is retained at all.
    pub fn retains_nothing(&self) -> bool {
        self.policies.iter().all(|p| !p.is_enabled())
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::from_limits(DEFAULT_LIMITS)
    }
}
