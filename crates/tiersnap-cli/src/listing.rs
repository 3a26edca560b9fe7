// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Parser for `ls -otg --time-style=+%FT%T%z` output.
//!
//! Each line looks like
//!
//! ```text
//! drwxr-xr-x 12 4096 2024-06-15T12:00:03+0200 hourly.00
//! ```
//!
//! The `total` header and anything that is not a directory are skipped.
//! Non-snapshot directory names are kept; the engine ignores them itself.

use std::sync::OnceLock;

use regex::Regex;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tiersnap_core::{Entry, StoreError};

/// Shell command producing the listing this module parses, for a quoted root.
///
/// Lists from inside the root so a root that is itself a symlink shows the
/// directory it points to rather than the link.
pub fn list_command(quoted_root: &str) -> String {
    format!("cd {quoted_root} && LC_ALL=C ls -otg --time-style=+%FT%T%z")
}

const TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);

fn line_pattern() -> Result<&'static Regex, StoreError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(?P<mode>\S+)\s+\d+\s+\d+\s+(?P<time>\S+)\s(?P<name>.+)$"))
        .as_ref()
        .map_err(|err| StoreError::Malformed(err.to_string()))
}

/// Parse a full listing into directory entries.
pub fn parse_listing(output: &str) -> Result<Vec<Entry>, StoreError> {
    let mut entries = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() || line.starts_with("total ") {
            continue;
        }
        if let Some(entry) = parse_line(line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Parse one line. Returns `None` for entries that are not directories.
pub fn parse_line(line: &str) -> Result<Option<Entry>, StoreError> {
    let caps = line_pattern()?
        .captures(line)
        .ok_or_else(|| StoreError::Malformed(format!("unrecognised listing line `{line}`")))?;
    if !caps["mode"].starts_with('d') {
        return Ok(None);
    }
    let modified = OffsetDateTime::parse(&caps["time"], TIMESTAMP).map_err(|err| {
        StoreError::Malformed(format!("bad timestamp `{}`: {err}", &caps["time"]))
    })?;
    Ok(Some(Entry::new(&caps["name"], modified)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const SAMPLE: &str = "\
total 24
drwxr-xr-x 12 4096 2024-06-15T12:00:03+0200 hourly.00
drwxr-xr-x 12 4096 2024-06-15T11:00:02+0200 hourly.01
drwxr-xr-x  3 4096 2024-06-14T23:59:59+0000 daily.01
-rw-r--r--  1  220 2024-06-01T08:00:00+0000 notes.txt
lrwxrwxrwx  1    9 2024-06-01T08:00:00+0000 latest -> hourly.01
drwx------  2 4096 2024-01-01T00:00:00-0500 lost+found
";

    #[test]
    fn keeps_directories_only() {
        let entries = parse_listing(SAMPLE).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["hourly.00", "hourly.01", "daily.01", "lost+found"]);
    }

    #[test]
    fn timestamps_keep_their_offset() {
        let entries = parse_listing(SAMPLE).unwrap();
        assert_eq!(entries[0].modified, datetime!(2024-06-15 10:00:03 UTC));
        assert_eq!(entries[3].modified, datetime!(2024-01-01 05:00 UTC));
    }

    #[test]
    fn names_with_spaces_survive() {
        let entry = parse_line("drwxr-xr-x 2 4096 2024-06-15T12:00:00+0000 old hourly")
            .unwrap()
            .unwrap();
        assert_eq!(entry.name, "old hourly");
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_listing("ls: cannot access '/srv': No such file or directory"),
            Err(StoreError::Malformed(_))
        ));
        assert!(matches!(
            parse_line("drwxr-xr-x 2 4096 yesterday hourly.00"),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn command_pins_locale_and_time_style() {
        assert_eq!(
            list_command("/srv/snaps"),
            "cd /srv/snaps && LC_ALL=C ls -otg --time-style=+%FT%T%z"
        );
    }
}
