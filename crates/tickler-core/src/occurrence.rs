//! The next-occurrence engine.
//!
//! [`next_occurrence`] is total over its input domain: malformed or
//! degenerate rules (an empty weekday mask, an office window that admits no
//! hour) are absorbed by bounded scans instead of an error path, so a bad
//! rule degrades to a slightly wrong recompute rather than a failure.

use chrono::{Datelike, Duration, Months, NaiveDateTime, NaiveTime, Timelike};
use tracing::warn;

use crate::rule::{Frequency, OfficeWindow, RecurrenceRule, WeekdaySet};

/// Upper bound on the hour-by-hour office-window scan.
///
/// Guarantees termination when no hour can ever qualify, e.g. an empty
/// weekday mask or a `start == end` window. On exhaustion the last candidate
/// is returned as-is.
pub const HOURLY_SCAN_CEILING: usize = 500;

/// Upper bound on the day-by-day scan for an allowed weekday after a
/// base-interval advance.
///
/// Seven steps always reach every weekday, so the cap only bites on an empty
/// mask, where it guarantees termination instead of looping forever.
pub const WEEKDAY_SCAN_CAP: u32 = 7;

/// Compute the next instant at which `rule` is due, strictly after `now`.
///
/// Pure and clock-free: `now` is whatever local wall-clock instant the
/// caller supplies, which keeps the function deterministic under test.
/// Never fails and always terminates, including on pathological rules.
///
/// Known quirk: `Hourly` without an office window
/// ignores the weekday mask entirely, while every other frequency applies
/// it. Changing this would alter user-visible behaviour.
pub fn next_occurrence(rule: &RecurrenceRule, now: NaiveDateTime) -> NaiveDateTime {
    match (rule.frequency, &rule.office_hours) {
        (Frequency::Hourly, Some(window)) => next_windowed_hour(rule.weekdays, window, now),
        (Frequency::Hourly, None) => next_whole_hour(rule, now),
        (Frequency::Daily, _) => next_interval_day(rule, now, 1),
        (Frequency::EveryThreeDays, _) => next_interval_day(rule, now, 3),
        (Frequency::Weekly, _) => next_interval_day(rule, now, 7),
        (Frequency::Monthly, _) => next_month(rule, now),
    }
}

/// Hourly with an office window: scan whole hours for one that falls inside
/// `[start.hour, end.hour)` on an allowed weekday.
fn next_windowed_hour(
    weekdays: WeekdaySet,
    window: &OfficeWindow,
    now: NaiveDateTime,
) -> NaiveDateTime {
    let start = u32::from(window.start.hour);
    let end = u32::from(window.end.hour);

    // Round up to the next whole hour.
    let mut candidate = truncate_to_hour(now);
    if now.minute() > 0 || now.second() > 0 {
        candidate += Duration::hours(1);
    }

    for _ in 0..HOURLY_SCAN_CEILING {
        let hour = candidate.hour();
        if hour >= start && hour < end && weekdays.contains(candidate.weekday()) && candidate > now
        {
            return candidate;
        }

        candidate += Duration::hours(1);

        // Past the end of the window (or before its start after a day
        // rollover): jump to the next day at the window start.
        let hour = candidate.hour();
        if hour >= end || hour < start {
            candidate = (candidate.date() + Duration::days(1)).and_time(on_the_hour(start));
        }
    }

    warn!(
        ceiling = HOURLY_SCAN_CEILING,
        "no hour satisfies the office window; returning the last candidate"
    );
    candidate
}

/// Hourly without a window: today at `time_of_day`, advanced hour by hour
/// until strictly after `now`. The weekday mask is deliberately not applied.
fn next_whole_hour(rule: &RecurrenceRule, now: NaiveDateTime) -> NaiveDateTime {
    let mut candidate = now.date().and_time(rule.time_of_day.to_naive_time());
    while candidate <= now {
        candidate += Duration::hours(1);
    }
    candidate
}

/// Daily, EveryThreeDays and Weekly share the same shape: seed today at
/// `time_of_day`, advance by the base interval when not strictly future,
/// then nudge forward to an allowed weekday.
fn next_interval_day(rule: &RecurrenceRule, now: NaiveDateTime, step_days: i64) -> NaiveDateTime {
    let mut candidate = now.date().and_time(rule.time_of_day.to_naive_time());
    if candidate <= now {
        candidate += Duration::days(step_days);
    }
    seek_allowed_weekday(candidate, rule.weekdays)
}

/// Monthly: advance one calendar month, clamped to the target month's
/// length (Jan 31 lands on Feb 28/29), then nudge to an allowed weekday.
fn next_month(rule: &RecurrenceRule, now: NaiveDateTime) -> NaiveDateTime {
    let mut candidate = now.date().and_time(rule.time_of_day.to_naive_time());
    if candidate <= now {
        candidate = candidate
            .checked_add_months(Months::new(1))
            .unwrap_or_else(|| candidate + Duration::days(31));
    }
    seek_allowed_weekday(candidate, rule.weekdays)
}

/// Advance day by day until the weekday is allowed, capped at
/// [`WEEKDAY_SCAN_CAP`] steps. On an empty mask the capped candidate is
/// returned unfiltered.
fn seek_allowed_weekday(mut candidate: NaiveDateTime, weekdays: WeekdaySet) -> NaiveDateTime {
    for _ in 0..WEEKDAY_SCAN_CAP {
        if weekdays.contains(candidate.weekday()) {
            return candidate;
        }
        candidate += Duration::days(1);
    }
    candidate
}

fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    t - Duration::minutes(i64::from(t.minute()))
        - Duration::seconds(i64::from(t.second()))
        - Duration::nanoseconds(i64::from(t.nanosecond()))
}

fn on_the_hour(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ClockTime;
    use chrono::{NaiveDate, Weekday};

    // 2024-01-01 was a Monday.
    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn at(h: u8, m: u8) -> ClockTime {
        ClockTime { hour: h, minute: m }
    }

    fn rule(frequency: Frequency, time: ClockTime, weekdays: WeekdaySet) -> RecurrenceRule {
        RecurrenceRule {
            frequency,
            time_of_day: time,
            weekdays,
            office_hours: None,
        }
    }

    fn hourly_windowed(start: u8, end: u8, weekdays: WeekdaySet) -> RecurrenceRule {
        RecurrenceRule {
            frequency: Frequency::Hourly,
            time_of_day: at(8, 0),
            weekdays,
            office_hours: Some(OfficeWindow {
                start: at(start, 0),
                end: at(end, 0),
            }),
        }
    }

    #[test]
    fn daily_skips_the_weekend() {
        // Friday 14:00 with a Mon..Fri mask lands on Monday 09:00.
        let r = rule(Frequency::Daily, at(9, 0), WeekdaySet::WEEKDAYS);
        let next = next_occurrence(&r, dt(2024, 1, 5, 14, 0));
        assert_eq!(next, dt(2024, 1, 8, 9, 0));
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn daily_same_day_when_time_still_ahead() {
        let r = rule(Frequency::Daily, at(9, 0), WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, dt(2024, 1, 2, 7, 30));
        assert_eq!(next, dt(2024, 1, 2, 9, 0));
    }

    #[test]
    fn daily_never_returns_now_itself() {
        // now exactly matches time_of_day: the tie always advances.
        let r = rule(Frequency::Daily, at(9, 0), WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, dt(2024, 1, 2, 9, 0));
        assert_eq!(next, dt(2024, 1, 3, 9, 0));
    }

    #[test]
    fn every_three_days_advances_then_accepts_allowed_day() {
        // Wednesday 20:30, due time 20:00 already passed: plus three days is
        // Saturday 20:00, allowed by the full mask, returned as-is.
        let r = rule(Frequency::EveryThreeDays, at(20, 0), WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, dt(2024, 1, 3, 20, 30));
        assert_eq!(next, dt(2024, 1, 6, 20, 0));
        assert_eq!(next.weekday(), Weekday::Sat);
    }

    #[test]
    fn every_three_days_nudges_to_allowed_weekday() {
        // Plus three days from Wednesday is Saturday; with a Mon..Fri mask
        // the day scan walks on to Monday.
        let r = rule(Frequency::EveryThreeDays, at(20, 0), WeekdaySet::WEEKDAYS);
        let next = next_occurrence(&r, dt(2024, 1, 3, 20, 30));
        assert_eq!(next, dt(2024, 1, 8, 20, 0));
    }

    #[test]
    fn weekly_advances_seven_days() {
        let r = rule(Frequency::Weekly, at(9, 0), WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, dt(2024, 1, 1, 10, 0));
        assert_eq!(next, dt(2024, 1, 8, 9, 0));
    }

    #[test]
    fn weekly_empty_mask_exhausts_the_scan_cap() {
        // The scan cannot find an allowed day, so it stops after seven
        // unfiltered steps instead of hanging.
        let r = rule(Frequency::Weekly, at(9, 0), WeekdaySet::EMPTY);
        let next = next_occurrence(&r, dt(2024, 1, 1, 10, 0));
        assert_eq!(next, dt(2024, 1, 15, 9, 0));
    }

    #[test]
    fn daily_empty_mask_still_terminates() {
        let now = dt(2024, 1, 1, 10, 0);
        let r = rule(Frequency::Daily, at(9, 0), WeekdaySet::EMPTY);
        let next = next_occurrence(&r, now);
        assert!(next > now);
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        // Jan 31 09:00 exactly: one month ahead clamps to Feb 29 (leap year).
        let r = rule(Frequency::Monthly, at(9, 0), WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, dt(2024, 1, 31, 9, 0));
        assert_eq!(next, dt(2024, 2, 29, 9, 0));
    }

    #[test]
    fn monthly_scans_past_a_disallowed_landing_day() {
        // Feb 29 2024 is a Thursday; a Friday-only mask pushes to Mar 1.
        let fridays = WeekdaySet::from_days(&[5]).unwrap();
        let r = rule(Frequency::Monthly, at(9, 0), fridays);
        let next = next_occurrence(&r, dt(2024, 1, 31, 9, 0));
        assert_eq!(next, dt(2024, 3, 1, 9, 0));
    }

    #[test]
    fn seven_steps_reach_every_weekday_of_a_nonempty_mask() {
        // The cap is only insufficient for the empty mask: from any start
        // day, seven steps cover all weekdays.
        for day in 0u8..7 {
            let mask = WeekdaySet::from_days(&[day]).unwrap();
            let r = rule(Frequency::Monthly, at(9, 0), mask);
            for start in 1u32..=7 {
                let next = next_occurrence(&r, dt(2024, 1, start, 10, 0));
                assert!(mask.contains(next.weekday()));
            }
        }
    }

    #[test]
    fn hourly_without_window_ignores_weekday_mask() {
        // Known quirk: Monday with a Saturday-only mask still
        // fires within the next hour.
        let saturdays = WeekdaySet::from_days(&[6]).unwrap();
        let r = rule(Frequency::Hourly, at(8, 0), saturdays);
        let next = next_occurrence(&r, dt(2024, 1, 1, 14, 30));
        assert_eq!(next, dt(2024, 1, 1, 15, 0));
    }

    #[test]
    fn hourly_without_window_advances_past_now() {
        let r = rule(Frequency::Hourly, at(8, 0), WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, dt(2024, 1, 1, 8, 0));
        assert_eq!(next, dt(2024, 1, 1, 9, 0));
    }

    #[test]
    fn windowed_hour_end_is_exclusive() {
        // Friday 16:45 in an 08:00-17:00 window: 17:00 is excluded, and the
        // weekend is masked out, so the next slot is Monday 08:00.
        let r = hourly_windowed(8, 17, WeekdaySet::WEEKDAYS);
        let next = next_occurrence(&r, dt(2024, 1, 5, 16, 45));
        assert_eq!(next, dt(2024, 1, 8, 8, 0));
    }

    #[test]
    fn windowed_hour_on_the_hour_advances() {
        // 10:00:00 sharp is not strictly after now, so 11:00 wins.
        let r = hourly_windowed(8, 17, WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, dt(2024, 1, 2, 10, 0));
        assert_eq!(next, dt(2024, 1, 2, 11, 0));
    }

    #[test]
    fn windowed_hour_before_window_snaps_to_start() {
        let r = hourly_windowed(8, 17, WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, dt(2024, 1, 2, 6, 15));
        assert_eq!(next, dt(2024, 1, 2, 8, 0));
    }

    #[test]
    fn windowed_hours_conform_to_window_and_mask() {
        let r = hourly_windowed(8, 17, WeekdaySet::WEEKDAYS);
        for hour in 0u32..24 {
            for minute in [0u32, 1, 30, 59] {
                let now = dt(2024, 1, 5, hour, minute);
                let next = next_occurrence(&r, now);
                assert!(next > now);
                assert!((8..17).contains(&next.hour()));
                assert!(WeekdaySet::WEEKDAYS.contains(next.weekday()));
            }
        }
    }

    #[test]
    fn degenerate_window_terminates_at_the_ceiling() {
        // start == end admits no hour at all; the scan must still return.
        let now = dt(2024, 1, 2, 10, 30);
        let r = hourly_windowed(9, 9, WeekdaySet::EVERY_DAY);
        let next = next_occurrence(&r, now);
        assert!(next > now);
    }

    #[test]
    fn windowed_empty_mask_terminates() {
        let now = dt(2024, 1, 2, 10, 30);
        let r = hourly_windowed(8, 17, WeekdaySet::EMPTY);
        let next = next_occurrence(&r, now);
        assert!(next > now);
    }

    #[test]
    fn strict_futurity_across_frequencies() {
        let frequencies = [
            Frequency::Hourly,
            Frequency::Daily,
            Frequency::EveryThreeDays,
            Frequency::Weekly,
            Frequency::Monthly,
        ];
        let masks = [WeekdaySet::EVERY_DAY, WeekdaySet::WEEKEND, WeekdaySet::EMPTY];
        for frequency in frequencies {
            for mask in masks {
                let r = rule(frequency, at(9, 0), mask);
                for hour in [0u32, 8, 9, 12, 23] {
                    let now = dt(2024, 1, 31, hour, 0);
                    assert!(next_occurrence(&r, now) > now, "{frequency} {hour}:00");
                }
            }
        }
    }
}
