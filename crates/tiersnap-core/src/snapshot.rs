// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot records and the `<tier>.<index>` naming scheme.
//!
//! A snapshot's identity is its [`SlotId`] (tier + index); the timestamp rides
//! along but never takes part in equality or ordering. The canonical layout
//! order (tier rank, then index) is exposed as the explicit comparator
//! [`Snapshot::layout_cmp`] rather than an `Ord` impl on [`Snapshot`], since it
//! is not a recency order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use time::OffsetDateTime;

use crate::tier::Tier;

/// Errors from parsing a snapshot directory name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Prefix is not a known tier name.
    #[error("[SNAP_UNKNOWN_TIER] unknown tier `{0}`")]
    UnknownTier(String),
    /// Name has no `.` between tier and index.
    #[error("[SNAP_NO_SEPARATOR] `{0}` is not of the form <tier>.<index>")]
    MissingSeparator(String),
    /// Index is not at least two ASCII digits, or does not fit a `u32`.
    #[error("[SNAP_BAD_INDEX] `{0}` is not a valid slot index")]
    BadIndex(String),
}

/// Identity of a snapshot: which tier, which slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotId {
    /// Frequency tier.
    pub tier: Tier,
    /// Slot within the tier; `0` is the pending slot.
    pub index: u32,
}

impl SlotId {
    /// Build a slot id.
    pub fn new(tier: Tier, index: u32) -> Self {
        Self { tier, index }
    }

    /// The pending (slot 0) id of `tier`.
    pub fn pending(tier: Tier) -> Self {
        Self::new(tier, 0)
    }

    /// Whether this is a pending slot.
    pub fn is_pending(&self) -> bool {
        self.index == 0
    }

    /// Directory name, e.g. `daily.07`.
    pub fn dir_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.tier, self.index)
    }
}

impl FromStr for SlotId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tier, index) = s
            .split_once('.')
            .ok_or_else(|| ParseError::MissingSeparator(s.to_owned()))?;
        let tier = tier.parse::<Tier>()?;
        if index.len() < 2 || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::BadIndex(index.to_owned()));
        }
        let id = Self {
            tier,
            index: index
                .parse::<u32>()
                .map_err(|_| ParseError::BadIndex(index.to_owned()))?,
        };
        // `hourly.001` would alias `hourly.01`; only names that render back
        // unchanged are slots.
        if id.to_string() != s {
            return Err(ParseError::BadIndex(index.to_owned()));
        }
        Ok(id)
    }
}

/// A single backup instance.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Tier and slot.
    pub id: SlotId,
    /// When the snapshot was last written.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl Snapshot {
    /// Build a snapshot record.
    pub fn new(tier: Tier, index: u32, timestamp: OffsetDateTime) -> Self {
        Self {
            id: SlotId::new(tier, index),
            timestamp,
        }
    }

    /// Parse a directory name and attach its timestamp.
    pub fn from_dir_name(name: &str, timestamp: OffsetDateTime) -> Result<Self, ParseError> {
        Ok(Self {
            id: name.parse()?,
            timestamp,
        })
    }

    /// Tier of this snapshot.
    pub fn tier(&self) -> Tier {
        self.id.tier
    }

    /// Slot index of this snapshot.
    pub fn index(&self) -> u32 {
        self.id.index
    }

    /// Whether this snapshot occupies its tier's pending slot.
    pub fn is_pending(&self) -> bool {
        self.id.is_pending()
    }

    /// Canonical layout order: tier rank ascending, then index ascending.
    pub fn layout_cmp(a: &Snapshot, b: &Snapshot) -> Ordering {
        a.id.tier
            .rank()
            .cmp(&b.id.tier.rank())
            .then(a.id.index.cmp(&b.id.index))
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Snapshot {}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.id, self.timestamp)
    }
}
