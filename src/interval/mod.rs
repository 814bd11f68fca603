//! Calendar interval module
//!
//! Fixed calendar granularities with truncation, ceiling, increment and
//! decrement arithmetic, all in UTC.
//!
//! # Overview
//!
//! Sub-day intervals and weeks are fixed-length and align to the Unix epoch,
//! so week boundaries fall on Thursdays (the epoch weekday), not on the
//! ISO-8601 Monday. Months, quarters and years are calendar-aware: adding a
//! month to a month boundary always lands on the first of the next month,
//! and quarters start in January, April, July and October.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 60 * MINUTE_SECS;
const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Partitioning granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Minute,
    #[serde(alias = "5min", alias = "five_minutes")]
    FiveMinute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Length of one interval unit
enum Step {
    Seconds(i64),
    Months(u32),
}

impl Interval {
    /// All intervals, finest first
    pub const ALL: [Interval; 8] = [
        Interval::Minute,
        Interval::FiveMinute,
        Interval::Hour,
        Interval::Day,
        Interval::Week,
        Interval::Month,
        Interval::Quarter,
        Interval::Year,
    ];

    /// Single-letter code used in partition names
    pub fn letter(&self) -> char {
        match self {
            Self::Minute => 'I',
            Self::FiveMinute => 'F',
            Self::Hour => 'H',
            Self::Day => 'D',
            Self::Week => 'W',
            Self::Month => 'M',
            Self::Quarter => 'Q',
            Self::Year => 'Y',
        }
    }

    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::FiveMinute => "five_minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    fn step(&self) -> Step {
        match self {
            Self::Minute => Step::Seconds(MINUTE_SECS),
            Self::FiveMinute => Step::Seconds(5 * MINUTE_SECS),
            Self::Hour => Step::Seconds(HOUR_SECS),
            Self::Day => Step::Seconds(DAY_SECS),
            Self::Week => Step::Seconds(7 * DAY_SECS),
            Self::Month => Step::Months(1),
            Self::Quarter => Step::Months(3),
            Self::Year => Step::Months(12),
        }
    }

    /// Largest boundary `<= at`
    pub fn truncate(&self, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match self.step() {
            Step::Seconds(unit) => {
                let secs = at.timestamp().div_euclid(unit) * unit;
                from_timestamp(secs)
            }
            Step::Months(months) => {
                let month0 = at.month0() / months * months;
                Utc.with_ymd_and_hms(at.year(), month0 + 1, 1, 0, 0, 0)
                    .single()
                    .ok_or_else(|| out_of_range(self, at))
            }
        }
    }

    /// Smallest boundary `>= at`
    pub fn ceiling(&self, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let floor = self.truncate(at)?;
        if floor == at {
            Ok(floor)
        } else {
            self.increment(floor)
        }
    }

    /// `at` plus one unit
    pub fn increment(&self, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let next = match self.step() {
            Step::Seconds(unit) => at.checked_add_signed(chrono::Duration::seconds(unit)),
            Step::Months(months) => at.checked_add_months(Months::new(months)),
        };
        next.ok_or_else(|| out_of_range(self, at))
    }

    /// `at` minus one unit
    pub fn decrement(&self, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let prev = match self.step() {
            Step::Seconds(unit) => at.checked_sub_signed(chrono::Duration::seconds(unit)),
            Step::Months(months) => at.checked_sub_months(Months::new(months)),
        };
        prev.ok_or_else(|| out_of_range(self, at))
    }

    /// Check if `at` lies exactly on a boundary
    pub fn is_aligned(&self, at: DateTime<Utc>) -> bool {
        self.truncate(at).is_ok_and(|t| t == at)
    }

    /// Format a boundary at the precision of this interval
    pub fn format(&self, at: DateTime<Utc>) -> String {
        let pattern = match self {
            Self::Year => "%Y",
            Self::Quarter | Self::Month => "%Y-%m",
            Self::Week | Self::Day => "%Y-%m-%d",
            Self::Hour | Self::FiveMinute | Self::Minute => crate::types::DATETIME_FORMAT,
        };
        at.format(pattern).to_string()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "i" => Ok(Self::Minute),
            "five_minute" | "five_minutes" | "5min" | "f" => Ok(Self::FiveMinute),
            "hour" | "h" => Ok(Self::Hour),
            "day" | "d" => Ok(Self::Day),
            "week" | "w" => Ok(Self::Week),
            "month" | "m" => Ok(Self::Month),
            "quarter" | "q" => Ok(Self::Quarter),
            "year" | "y" => Ok(Self::Year),
            other => Err(Error::invalid_value(
                "partition",
                format!("unknown interval '{other}'"),
            )),
        }
    }
}

fn from_timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::date_out_of_range(format!("timestamp {secs}")))
}

fn out_of_range(interval: &Interval, at: DateTime<Utc>) -> Error {
    Error::date_out_of_range(format!("{at} cannot be stepped by one {interval}"))
}
