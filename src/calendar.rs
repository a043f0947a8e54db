//! Calendar arithmetic
//!
//! Pure date functions behind navigation and bucketing: week-of-month,
//! month wrap-around, query window bounds and the fixed bucket shift.
//! Months are zero-based (January = 0) throughout.

use crate::types::{BucketKey, DayOfWeek, ViewWindow, WEEKS_PER_MONTH};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};

/// Hours subtracted from local time before bucketing
pub const BUCKET_SHIFT_HOURS: i64 = 7;

/// First day of a month
pub fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month % 12 + 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Weekday index of the 1st of the month (0 = Sunday)
pub fn first_weekday_offset(year: i32, month: u32) -> u32 {
    first_of_month(year, month).weekday().num_days_from_sunday()
}

/// Number of days in a month; zero when the month is outside the supported range.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    (28..=31)
        .rev()
        .find(|&day| NaiveDate::from_ymd_opt(year, month % 12 + 1, day).is_some())
        .unwrap_or(0)
}

/// Week number of a date within its month.
///
/// Counts calendar rows of a Sunday-first month view, capped at the number
/// of week buttons so the result always has a selector.
pub fn week_of_month(date: NaiveDate) -> u32 {
    let offset = first_weekday_offset(date.year(), date.month0());
    let week = (date.day() + offset + 6) / 7;
    week.clamp(1, WEEKS_PER_MONTH)
}

/// Move `delta` months from `(year, month)`, rolling the year at the boundaries.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let total = (month % 12) as i32 + delta;
    (year.saturating_add(total.div_euclid(12)), total.rem_euclid(12) as u32)
}

/// Inclusive local bounds of a window's query.
///
/// Starts at midnight of day `week*7-6` and ends at midnight of day
/// `week*7`, with the end clipped to the last day of the month. Returns
/// `None` when the window starts past the end of the month or the month
/// cannot be represented.
pub fn window_bounds(window: &ViewWindow) -> Option<(NaiveDateTime, NaiveDateTime)> {
    if window.week == 0 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(window.year, window.month % 12 + 1, 1)?;
    let last_day = days_in_month(window.year, window.month);
    let start_day = window.week.saturating_mul(7) - 6;
    if start_day > last_day {
        return None;
    }
    let end_day = window.week.saturating_mul(7).min(last_day);

    let start = first.with_day(start_day)?;
    let end = first.with_day(end_day)?;
    Some((start.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN)))
}

/// Wall-clock time of a store timestamp in the given offset
pub fn to_local(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> NaiveDateTime {
    timestamp.with_timezone(offset).naive_local()
}

/// Instant of a wall-clock time in the given offset; `None` when the shift
/// leaves the representable range.
pub fn local_to_utc(local: &NaiveDateTime, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let utc = local.checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
    Some(Utc.from_utc_datetime(&utc))
}

/// Apply the fixed bucketing shift to a local time
pub fn shift_for_bucket(local: &NaiveDateTime) -> NaiveDateTime {
    local
        .checked_sub_signed(Duration::hours(BUCKET_SHIFT_HOURS))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Bucket of an already shifted timestamp
pub fn bucket_of(shifted: &NaiveDateTime) -> BucketKey {
    BucketKey::new(DayOfWeek::from(shifted.weekday()), shifted.hour())
}

/// Display label such as "October 2026"
pub fn month_label(year: i32, month: u32) -> String {
    let name = first_of_month(2000, month).format("%B");
    format!("{} {}", name, year)
}

/// Row label such as "08.01-09.00"
pub fn hour_range_label(hour: u32) -> String {
    format!("{:02}.01-{:02}.00", hour, hour + 1)
}

/// Tooltip date such as "16/10/2026"
pub fn tooltip_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%d/%m/%Y").to_string()
}
