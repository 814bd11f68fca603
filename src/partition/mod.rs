//! Date range partitioning module
//!
//! Splits a creation-date range into calendar-aligned, contiguous,
//! non-overlapping partitions that can be read independently.
//!
//! # Overview
//!
//! Partitions are produced newest first, so a pool that is short on workers
//! makes progress on the most recent data before older data. Partitions may
//! extend up to one interval past either end of the requested range so that
//! every boundary stays aligned to the interval.

mod partitioner;
mod types;

pub use partitioner::DatePartitioner;
pub use types::DatePartition;
