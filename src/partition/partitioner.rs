//! Date range partitioner

use super::types::DatePartition;
use crate::error::Result;
use crate::interval::Interval;
use crate::types::DateTimeRange;
use tracing::debug;

/// Divides a date range into newest-first calendar partitions
#[derive(Debug, Clone, Copy)]
pub struct DatePartitioner {
    range: DateTimeRange,
    interval: Interval,
}

impl DatePartitioner {
    /// Create a partitioner for `range` at `interval` granularity
    pub fn new(range: DateTimeRange, interval: Interval) -> Self {
        Self { range, interval }
    }

    /// The range being partitioned
    pub fn range(&self) -> DateTimeRange {
        self.range
    }

    /// The partition granularity
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Generate partitions, newest first.
    ///
    /// An unbounded or empty range yields no partitions. A range narrower
    /// than one interval yields the single enclosing partition.
    pub fn partitions(&self) -> Result<Vec<DatePartition>> {
        let (Some(start), Some(end)) = (self.range.start, self.range.end) else {
            return Ok(Vec::new());
        };
        if end <= start {
            return Ok(Vec::new());
        }

        let mut partitions = Vec::new();
        let mut upper = self.interval.ceiling(end)?;
        loop {
            let partition = DatePartition::ending_at(self.interval, upper)?;
            partitions.push(partition);
            if partition.start() <= start {
                break;
            }
            upper = partition.start();
        }

        debug!(
            "Partitioned {} by {} into {} partitions",
            self.range,
            self.interval,
            partitions.len()
        );
        Ok(partitions)
    }
}
