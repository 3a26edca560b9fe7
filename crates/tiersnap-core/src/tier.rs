// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Frequency tiers and the calendar units they are spaced by.

use std::fmt;
use std::str::FromStr;

use crate::snapshot::ParseError;

/// A frequency class of backup retention.
///
/// Tiers form a fixed sequence from finest to coarsest. The declaration order
/// is the rank order, so the derived `Ord` compares by rank.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Tier {
    /// Every run (typically hourly from cron).
    Hourly,
    /// One per day.
    Daily,
    /// One per week.
    Weekly,
    /// One per calendar month.
    Monthly,
    /// One per calendar year.
    Yearly,
}

impl Tier {
    /// All tiers, finest first.
    pub const ALL: [Tier; 5] = [
        Tier::Hourly,
        Tier::Daily,
        Tier::Weekly,
        Tier::Monthly,
        Tier::Yearly,
    ];

    /// The tier that sync writes into.
    pub const FINEST: Tier = Tier::Hourly;

    /// Position in [`Tier::ALL`].
    pub fn rank(self) -> usize {
        self as usize
    }

    /// Directory-name prefix for this tier.
    pub fn name(self) -> &'static str {
        match self {
            Tier::Hourly => "hourly",
            Tier::Daily => "daily",
            Tier::Weekly => "weekly",
            Tier::Monthly => "monthly",
            Tier::Yearly => "yearly",
        }
    }

    /// Look a tier up by its directory-name prefix.
    pub fn from_name(name: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|tier| tier.name() == name)
    }

    /// The next coarser tier, ignoring policy.
    pub fn coarser(self) -> Option<Tier> {
        Tier::ALL.get(self.rank() + 1).copied()
    }

    /// The next finer tier, ignoring policy.
    pub fn finer(self) -> Option<Tier> {
        self.rank().checked_sub(1).map(|rank| Tier::ALL[rank])
    }

    /// Default calendar spacing between two committed slots of this tier.
    pub fn default_spacing(self) -> SpacingUnit {
        match self {
            Tier::Hourly => SpacingUnit::Hour,
            Tier::Daily => SpacingUnit::Day,
            Tier::Weekly => SpacingUnit::Week,
            Tier::Monthly => SpacingUnit::Month,
            Tier::Yearly => SpacingUnit::Year,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Tier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::from_name(s).ok_or_else(|| ParseError::UnknownTier(s.to_owned()))
    }
}

/// Calendar unit used to measure the distance between slots.
///
/// `Month` and `Year` are calendar-relative (day-of-month is clamped when the
/// target month is shorter); the others are fixed durations.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SpacingUnit {
    /// 60 seconds.
    Minute,
    /// 60 minutes.
    Hour,
    /// 24 hours.
    Day,
    /// 7 days.
    Week,
    /// One calendar month.
    Month,
    /// One calendar year.
    Year,
}

impl SpacingUnit {
    /// The unit one step finer, saturating at `Minute`.
    pub fn finer(self) -> SpacingUnit {
        match self {
            SpacingUnit::Minute | SpacingUnit::Hour => SpacingUnit::Minute,
            SpacingUnit::Day => SpacingUnit::Hour,
            SpacingUnit::Week => SpacingUnit::Day,
            SpacingUnit::Month => SpacingUnit::Week,
            SpacingUnit::Year => SpacingUnit::Month,
        }
    }
}

impl fmt::Display for SpacingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpacingUnit::Minute => "minute",
            SpacingUnit::Hour => "hour",
            SpacingUnit::Day => "day",
            SpacingUnit::Week => "week",
            SpacingUnit::Month => "month",
            SpacingUnit::Year => "year",
        };
        f.write_str(name)
    }
}
