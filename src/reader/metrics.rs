//! Per-reader progress counters

use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters owned by one reader.
///
/// Only the owning reader writes; progress reporting reads concurrently.
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    expected: AtomicU64,
    processed: AtomicU64,
    pages: AtomicU64,
}

impl ReaderMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the expected row count; never lowers it
    pub fn set_expected(&self, expected: u64) {
        self.expected.fetch_max(expected, Ordering::Relaxed);
    }

    /// Record a delivered page of `rows` rows
    pub fn add_page(&self, rows: u64) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(rows, Ordering::Relaxed);
    }

    /// Expected row count
    pub fn expected(&self) -> u64 {
        self.expected.load(Ordering::Relaxed)
    }

    /// Rows delivered to the sink
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Pages delivered to the sink
    pub fn pages(&self) -> u64 {
        self.pages.load(Ordering::Relaxed)
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            expected: self.expected(),
            processed: self.processed(),
            pages: self.pages(),
        }
    }
}

/// Plain copy of `ReaderMetrics`, summed across partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Expected row count
    pub expected: u64,
    /// Rows delivered to the sink
    pub processed: u64,
    /// Pages delivered to the sink
    pub pages: u64,
}

impl Add for MetricsSnapshot {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            expected: self.expected + rhs.expected,
            processed: self.processed + rhs.processed,
            pages: self.pages + rhs.pages,
        }
    }
}

impl AddAssign for MetricsSnapshot {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for MetricsSnapshot {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
