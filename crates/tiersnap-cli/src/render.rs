// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Human-readable output for `status`, `rotate` and `backup`.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, Table};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tiersnap_core::{
    readiness, Readiness, RotationReport, SnapshotCollection, Tier, TierOutcome,
};

use crate::disk::DiskUsage;

/// Compact age like `3d 4h`, `2h 05m` or `40s`.
pub fn age(elapsed: Duration) -> String {
    if elapsed.is_negative() {
        return "in the future".into();
    }
    let days = elapsed.whole_days();
    let hours = elapsed.whole_hours() % 24;
    let minutes = elapsed.whole_minutes() % 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{}s", elapsed.whole_seconds())
    }
}

fn timestamp(at: OffsetDateTime) -> String {
    at.to_offset(time::UtcOffset::UTC)
        .replace_millisecond(0)
        .unwrap_or(at)
        .format(&Rfc3339)
        .unwrap_or_else(|_| at.to_string())
}

/// Snapshot table, one row per slot, finest tier first.
pub fn status_table(collection: &SnapshotCollection, now: OffsetDateTime) -> Table {
    let policy = collection.policy();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(vec![
        "snapshot",
        "taken (UTC)",
        "age",
        "note",
    ]);
    for tier in Tier::ALL {
        let members = collection.filter(tier);
        let kept = policy.limit(tier) + 1;
        for (position, snapshot) in members.iter().enumerate() {
            let note = if snapshot.is_pending() {
                if readiness(collection, tier).is_eligible() {
                    "pending, due"
                } else {
                    "pending"
                }
            } else if !policy.is_enabled(tier) {
                "tier disabled"
            } else if position >= kept {
                "over limit"
            } else {
                ""
            };
            table.add_row(vec![
                Cell::new(snapshot.id),
                Cell::new(timestamp(snapshot.timestamp)),
                Cell::new(age(now - snapshot.timestamp)).set_alignment(CellAlignment::Right),
                Cell::new(note),
            ]);
        }
    }
    table
}

/// One line per tier: members held against the limit.
pub fn tier_summary(collection: &SnapshotCollection) -> String {
    let policy = collection.policy();
    Tier::ALL
        .into_iter()
        .map(|tier| {
            let limit = policy.limit(tier);
            if limit == 0 {
                format!("{tier:<8} disabled ({} present)", collection.count(tier))
            } else {
                format!("{tier:<8} {}/{limit}", collection.count(tier))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Disk usage line for `status`.
pub fn disk_line(usage: &DiskUsage) -> String {
    let gib = |kib: u64| kib / (1024 * 1024);
    format!(
        "{} on {}: {} GiB free of {} GiB ({}% used)",
        usage.filesystem,
        usage.mounted_on,
        gib(usage.available_kib),
        gib(usage.total_kib),
        usage.used_percent()
    )
}

/// Per-tier account of a rotation run, followed by its operations.
pub fn report(report: &RotationReport) -> String {
    let mut lines = Vec::new();
    for plan in &report.tiers {
        let summary = match plan.outcome {
            TierOutcome::Promoted { from, into } => format!("promoted {from} to {into}"),
            TierOutcome::Capped { dropped } => format!("full, dropped {dropped}"),
            TierOutcome::Extended { slot } => format!("rotated into {slot}"),
            TierOutcome::PurgedDebris => "removed leftover pending slot".to_owned(),
            TierOutcome::Skipped(state) => format!("skipped ({})", describe(state)),
        };
        lines.push(format!("{:<8} {summary}", plan.tier));
        lines.extend(plan.ops.iter().map(|op| format!("  {op}")));
    }
    if !report.changed() {
        lines.push("nothing to do".into());
    }
    lines.join("\n")
}

fn describe(state: Readiness) -> &'static str {
    match state {
        Readiness::Disabled => "disabled",
        Readiness::Empty => "empty",
        Readiness::NoPending => "nothing pending",
        Readiness::LonePending => "first snapshot",
        Readiness::Due => "due",
        Readiness::NotDue => "not due yet",
    }
}
