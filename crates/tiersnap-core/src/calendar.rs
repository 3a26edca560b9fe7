// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Calendar shifts for eligibility thresholds.
//!
//! A [`Shift`] accumulates signed amounts of [`SpacingUnit`]s. Month and year
//! amounts are folded into a single month offset and applied to the calendar
//! date first (clamping the day to the target month's length); the remaining
//! fixed units are then added as one [`Duration`]. Folding matters: `-1 year
//! +1 month` is an eleven-month step back, not a year back from a clamped
//! date.

use time::{Date, Duration, Month, OffsetDateTime};

use crate::tier::SpacingUnit;

/// A signed calendar offset.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Shift {
    months: i64,
    fixed: Duration,
}

impl Shift {
    /// The empty shift.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Add `amount` units of `unit` to this shift.
    pub fn plus(mut self, unit: SpacingUnit, amount: i64) -> Self {
        match unit {
            SpacingUnit::Minute => self.fixed += Duration::minutes(amount),
            SpacingUnit::Hour => self.fixed += Duration::hours(amount),
            SpacingUnit::Day => self.fixed += Duration::days(amount),
            SpacingUnit::Week => self.fixed += Duration::weeks(amount),
            SpacingUnit::Month => self.months += amount,
            SpacingUnit::Year => self.months += amount * 12,
        }
        self
    }

    /// Net calendar months in this shift.
    pub fn months(&self) -> i64 {
        self.months
    }

    /// Net fixed-duration part of this shift.
    pub fn fixed(&self) -> Duration {
        self.fixed
    }

    /// Apply the shift. Returns `None` if the result leaves `time`'s range.
    pub fn apply(&self, at: OffsetDateTime) -> Option<OffsetDateTime> {
        add_months(at, self.months)?.checked_add(self.fixed)
    }
}

/// The tolerance shift applied to a pending candidate: one unit of the tier
/// back, one unit of the tier below forward.
pub fn tolerance(spacing: SpacingUnit, finer: SpacingUnit) -> Shift {
    Shift::zero().plus(spacing, -1).plus(finer, 1)
}

fn add_months(at: OffsetDateTime, months: i64) -> Option<OffsetDateTime> {
    if months == 0 {
        return Some(at);
    }
    let absolute = i64::from(at.year()) * 12 + i64::from(u8::from(at.month())) - 1 + months;
    let year = i32::try_from(absolute.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(absolute.rem_euclid(12) + 1).ok()?).ok()?;
    let date = clamped_date(year, month, at.day())?;
    Some(at.replace_date(date))
}

fn clamped_date(year: i32, month: Month, day: u8) -> Option<Date> {
    // Month lengths bottom out at 28, so at most three retries.
    (day.min(31).saturating_sub(3)..=day.min(31))
        .rev()
        .find_map(|d| Date::from_calendar_date(year, month, d).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn hourly_tolerance_is_fifty_nine_minutes_back() {
        let shift = tolerance(SpacingUnit::Hour, SpacingUnit::Minute);
        let at = datetime!(2024-03-10 12:00 UTC);
        assert_eq!(shift.apply(at), Some(datetime!(2024-03-10 11:01 UTC)));
    }

    #[test]
    fn daily_tolerance_is_twenty_three_hours_back() {
        let shift = tolerance(SpacingUnit::Day, SpacingUnit::Hour);
        let at = datetime!(2024-03-10 00:30 UTC);
        assert_eq!(shift.apply(at), Some(datetime!(2024-03-09 01:30 UTC)));
    }

    #[test]
    fn monthly_tolerance_clamps_then_adds_a_week() {
        let shift = tolerance(SpacingUnit::Month, SpacingUnit::Week);
        assert_eq!(shift.months(), -1);
        assert_eq!(shift.fixed(), Duration::weeks(1));
        // March 31st -> February 29th (leap year) -> March 7th.
        let at = datetime!(2024-03-31 06:00 UTC);
        assert_eq!(shift.apply(at), Some(datetime!(2024-03-07 06:00 UTC)));
    }

    #[test]
    fn yearly_tolerance_folds_into_eleven_months() {
        let shift = tolerance(SpacingUnit::Year, SpacingUnit::Month);
        assert_eq!(shift.months(), -11);
        assert_eq!(shift.fixed(), Duration::ZERO);
        let at = datetime!(2025-01-31 00:00 UTC);
        assert_eq!(shift.apply(at), Some(datetime!(2024-02-29 00:00 UTC)));
    }

    #[test]
    fn month_arithmetic_crosses_year_boundaries() {
        let at = datetime!(2024-01-15 08:00 +02:00);
        let back = Shift::zero().plus(SpacingUnit::Month, -2).apply(at).unwrap();
        assert_eq!(back, datetime!(2023-11-15 08:00 +02:00));
        let forward = Shift::zero().plus(SpacingUnit::Year, 1).apply(at).unwrap();
        assert_eq!(forward, datetime!(2025-01-15 08:00 +02:00));
    }
}
