//! Partition types

use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::types::DateTimeRange;
use chrono::{DateTime, Utc};
use std::fmt;

/// One calendar-aligned `[start, end)` slice of a date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatePartition {
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DatePartition {
    /// Create the partition starting at `start`, which must be aligned to `interval`
    pub fn new(interval: Interval, start: DateTime<Utc>) -> Result<Self> {
        if !interval.is_aligned(start) {
            return Err(Error::invalid_value(
                "partition",
                format!("{start} is not aligned to a {interval} boundary"),
            ));
        }
        let end = interval.increment(start)?;
        Ok(Self {
            interval,
            start,
            end,
        })
    }

    /// Create the partition that ends at `end`, which must be aligned to `interval`
    pub fn ending_at(interval: Interval, end: DateTime<Utc>) -> Result<Self> {
        Self::new(interval, interval.decrement(end)?)
    }

    /// Granularity that produced this partition
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Inclusive start
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// The partition as a date range
    pub fn range(&self) -> DateTimeRange {
        DateTimeRange {
            start: Some(self.start),
            end: Some(self.end),
        }
    }

    /// Display name, e.g. `M2019-12` or `D2024-01-15`
    pub fn name(&self) -> String {
        format!("{}{}", self.interval.letter(), self.interval.format(self.start))
    }
}

impl fmt::Display for DatePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
