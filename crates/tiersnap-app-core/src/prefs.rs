// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved retention preferences shared by tiersnap tools.

use serde::{Deserialize, Serialize};
use tiersnap_core::{PolicyTable, Tier, DEFAULT_LIMITS};

/// Config key the retention preferences are stored under.
pub const RETENTION_KEY: &str = "retention";

/// How many snapshots of each tier to keep, plus transfer options.
///
/// Missing fields fall back to their defaults, so a config file written by an
/// older version (or by hand, with only a couple of tiers) still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPrefs {
    /// Hourly slots to keep.
    pub hourly: usize,
    /// Daily slots to keep.
    pub daily: usize,
    /// Weekly slots to keep.
    pub weekly: usize,
    /// Monthly slots to keep.
    pub monthly: usize,
    /// Yearly slots to keep.
    pub yearly: usize,
    /// Pass `--delete` to rsync so files removed at the source vanish from the
    /// newest snapshot.
    pub rsync_delete: bool,
    /// Extra `--exclude` patterns for rsync.
    pub excludes: Vec<String>,
}

impl Default for RetentionPrefs {
    fn default() -> Self {
        let [hourly, daily, weekly, monthly, yearly] = DEFAULT_LIMITS;
        Self {
            hourly,
            daily,
            weekly,
            monthly,
            yearly,
            rsync_delete: true,
            excludes: Vec::new(),
        }
    }
}

impl RetentionPrefs {
    /// Limits in tier order, finest first.
    pub fn limits(&self) -> [usize; 5] {
        [self.hourly, self.daily, self.weekly, self.monthly, self.yearly]
    }

    /// Limit for one tier.
    pub fn limit(&self, tier: Tier) -> usize {
        self.limits()[tier.rank()]
    }

    /// Override the limit for one tier.
    pub fn set_limit(&mut self, tier: Tier, limit: usize) {
        let slot = match tier {
            Tier::Hourly => &mut self.hourly,
            Tier::Daily => &mut self.daily,
            Tier::Weekly => &mut self.weekly,
            Tier::Monthly => &mut self.monthly,
            Tier::Yearly => &mut self.yearly,
        };
        *slot = limit;
    }

    /// Build the rotation policy these preferences describe.
    pub fn policy(&self) -> PolicyTable {
        PolicyTable::from_limits(self.limits())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_core_defaults() {
        let prefs = RetentionPrefs::default();
        assert_eq!(prefs.limits(), DEFAULT_LIMITS);
        assert_eq!(prefs.policy(), PolicyTable::default());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let prefs: RetentionPrefs = serde_json::from_str(r#"{"daily": 14, "yearly": 0}"#).unwrap();
        assert_eq!(prefs.daily, 14);
        assert_eq!(prefs.yearly, 0);
        assert_eq!(prefs.hourly, DEFAULT_LIMITS[0]);
        assert!(prefs.rsync_delete);
        assert_eq!(prefs.policy().next_tier(Tier::Monthly), None);
    }

    #[test]
    fn set_limit_targets_one_tier() {
        let mut prefs = RetentionPrefs::default();
        prefs.set_limit(Tier::Weekly, 9);
        assert_eq!(prefs.limit(Tier::Weekly), 9);
        assert_eq!(prefs.limit(Tier::Daily), DEFAULT_LIMITS[1]);
    }
}
