//! Core types for the speed heatmap
//!
//! This module defines the data that flows from the store into the grid:
//! normalized speed records, their day/hour buckets, the selected view window
//! and the labels derived from it.

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower bound (km/hr, inclusive) of the fast tier
pub const FAST_THRESHOLD_KMH: f64 = 12.0;

/// Lower bound (km/hr, inclusive) of the moderate tier
pub const MODERATE_THRESHOLD_KMH: f64 = 7.0;

/// First hour row shown in the grid
pub const FIRST_HOUR: u32 = 8;

/// Last hour row shown in the grid
pub const LAST_HOUR: u32 = 22;

/// Number of week buttons in the selector
pub const WEEKS_PER_MONTH: u32 = 5;

/// Grid column, Monday first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    /// All days in grid column order
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    /// Column index in the grid (0 = Monday)
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "MON",
            DayOfWeek::Tue => "TUE",
            DayOfWeek::Wed => "WED",
            DayOfWeek::Thu => "THU",
            DayOfWeek::Fri => "FRI",
            DayOfWeek::Sat => "SAT",
            DayOfWeek::Sun => "SUN",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|day| upper.starts_with(day.as_str()))
            .ok_or_else(|| format!("not a day of week: {}", s))
    }
}

/// A (day-of-week, hour) cell of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub day: DayOfWeek,
    pub hour: u32,
}

impl BucketKey {
    pub fn new(day: DayOfWeek, hour: u32) -> Self {
        Self { day, hour }
    }

    /// Whether this bucket has a row in the grid
    pub fn is_displayed(&self) -> bool {
        (FIRST_HOUR..=LAST_HOUR).contains(&self.hour)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.day, self.hour)
    }
}

/// Hovered grid cell, if any
pub type HoverState = Option<BucketKey>;

/// A speed measurement normalized for bucketing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedRecord {
    /// Opaque document key from the store
    pub id: String,
    /// Local time shifted for bucketing
    pub timestamp: NaiveDateTime,
    /// Speed in km/hr
    pub speed: f64,
    /// Bucket derived from `timestamp`
    pub bucket: BucketKey,
}

/// Selected month/year/week
///
/// `month` is zero-based (January = 0) and always in `[0, 11]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewWindow {
    pub year: i32,
    pub month: u32,
    pub week: u32,
}

impl ViewWindow {
    pub fn new(year: i32, month: u32, week: u32) -> Self {
        Self {
            year,
            month: month % 12,
            week,
        }
    }
}

impl fmt::Display for ViewWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02} week {}", self.year, self.month + 1, self.week)
    }
}

/// Academic semester derived from the selected month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semester {
    /// July to October
    First,
    /// November to March
    Second,
    /// April to June
    Summer,
}

impl Semester {
    /// Classify a zero-based month
    pub fn from_month(month: u32) -> Self {
        match month % 12 {
            6..=9 => Semester::First,
            3..=5 => Semester::Summer,
            _ => Semester::Second,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Semester::First => "1st Semester (July - October)",
            Semester::Second => "2nd Semester (November - March)",
            Semester::Summer => "Summer Semester (April - June)",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Colour tier of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    Fast,
    Moderate,
    Slow,
    Unknown,
}

impl SpeedTier {
    /// Classify a bucket's speed; `None` means no record for the bucket.
    pub fn classify(speed: Option<f64>) -> Self {
        match speed {
            None => SpeedTier::Unknown,
            Some(s) if s >= FAST_THRESHOLD_KMH => SpeedTier::Fast,
            Some(s) if s >= MODERATE_THRESHOLD_KMH => SpeedTier::Moderate,
            Some(_) => SpeedTier::Slow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedTier::Fast => "fast",
            SpeedTier::Moderate => "moderate",
            SpeedTier::Slow => "slow",
            SpeedTier::Unknown => "unknown",
        }
    }

    /// Single-character glyph for text rendering
    pub fn glyph(&self) -> char {
        match self {
            SpeedTier::Fast => 'F',
            SpeedTier::Moderate => 'M',
            SpeedTier::Slow => 'S',
            SpeedTier::Unknown => '.',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_examples() {
        assert_eq!(SpeedTier::classify(Some(12.00)), SpeedTier::Fast);
        assert_eq!(SpeedTier::classify(Some(6.99)), SpeedTier::Slow);
        assert_eq!(SpeedTier::classify(Some(7.00)), SpeedTier::Moderate);
        assert_eq!(SpeedTier::classify(None), SpeedTier::Unknown);
    }

    #[test]
    fn test_tier_partition_is_total() {
        // Sweep 0..30 km/hr in 0.01 steps; every value lands in exactly one tier.
        for i in 0..3000 {
            let speed = i as f64 / 100.0;
            let tier = SpeedTier::classify(Some(speed));
            let expected = if speed >= 12.0 {
                SpeedTier::Fast
            } else if speed >= 7.0 {
                SpeedTier::Moderate
            } else {
                SpeedTier::Slow
            };
            assert_eq!(tier, expected, "speed {}", speed);
            assert_ne!(tier, SpeedTier::Unknown);
        }
    }

    #[test]
    fn test_semester_by_month() {
        let expected = [
            Semester::Second, // Jan
            Semester::Second,
            Semester::Second,
            Semester::Summer, // Apr
            Semester::Summer,
            Semester::Summer,
            Semester::First, // Jul
            Semester::First,
            Semester::First,
            Semester::First,
            Semester::Second, // Nov
            Semester::Second,
        ];
        for (month, semester) in expected.iter().enumerate() {
            assert_eq!(Semester::from_month(month as u32), *semester, "month {}", month);
        }
        assert_eq!(Semester::First.label(), "1st Semester (July - October)");
    }

    #[test]
    fn test_day_of_week_parse() {
        assert_eq!("tue".parse::<DayOfWeek>().unwrap(), DayOfWeek::Tue);
        assert_eq!("SUNDAY".parse::<DayOfWeek>().unwrap(), DayOfWeek::Sun);
        assert!("xyz".parse::<DayOfWeek>().is_err());
        assert_eq!(DayOfWeek::from_index(6), Some(DayOfWeek::Sun));
        assert_eq!(DayOfWeek::from_index(7), None);
    }

    #[test]
    fn test_bucket_display_range() {
        assert!(BucketKey::new(DayOfWeek::Mon, 8).is_displayed());
        assert!(BucketKey::new(DayOfWeek::Mon, 22).is_displayed());
        assert!(!BucketKey::new(DayOfWeek::Mon, 7).is_displayed());
        assert!(!BucketKey::new(DayOfWeek::Mon, 23).is_displayed());
        assert_eq!(BucketKey::new(DayOfWeek::Tue, 14).to_string(), "TUE-14");
    }
}
