//! Calendar helpers
//!
//! Kept deliberately small so every caller agrees on what a "day" and a
//! "weekday" are. Weekdays are numbered 1-7 starting on Sunday.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Calendar day (UTC) containing the given instant
pub fn start_of_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Shift a date by a (possibly negative) number of days
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Weekday number, 1 = Sunday ... 7 = Saturday
pub fn weekday_of(date: NaiveDate) -> u32 {
    date.weekday().number_from_sunday()
}

/// Whole days from `from` to `to` (negative if `to` is earlier)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
