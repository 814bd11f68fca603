//! Reader types

use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::pagination::Pagination;
use crate::query::EncodedQuery;
use crate::types::DateTimeRange;
use std::fmt;
use std::time::Duration;

/// Default interval between scheduler progress polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Lifecycle of a `TableReader`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderState {
    /// Constructed, nothing fetched yet
    #[default]
    Created,
    /// Fetching statistics
    Initializing,
    /// Initialized and waiting to run
    Ready,
    /// Walking pages
    Running,
    /// Every page delivered
    Complete,
    /// Stopped on an error
    Failed,
}

impl ReaderState {
    /// Check if the reader has stopped for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runtime settings shared by a reader and every partition derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderOptions {
    /// Pagination strategy
    pub pagination: Pagination,
    /// Rows per page or keys per slice
    pub page_size: usize,
    /// Worker count; 0 or 1 runs partitions sequentially
    pub threads: usize,
    /// Base filter predicate
    pub filter: Option<String>,
    /// Created-on bounds
    pub created: DateTimeRange,
    /// Updated-on bounds
    pub updated: DateTimeRange,
    /// Partition granularity; `None` reads the table as one unit
    pub partition: Option<Interval>,
    /// How often the scheduler logs progress
    pub poll_interval: Duration,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::new(Pagination::default())
    }
}

impl ReaderOptions {
    /// Options for `pagination` with its default page size
    pub fn new(pagination: Pagination) -> Self {
        Self {
            pagination,
            page_size: pagination.default_page_size(),
            threads: 0,
            filter: None,
            created: DateTimeRange::unbounded(),
            updated: DateTimeRange::unbounded(),
            partition: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set worker count
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set base filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set created-on bounds
    #[must_use]
    pub fn with_created(mut self, range: DateTimeRange) -> Self {
        self.created = range;
        self
    }

    /// Set updated-on bounds
    #[must_use]
    pub fn with_updated(mut self, range: DateTimeRange) -> Self {
        self.updated = range;
        self
    }

    /// Partition the read by creation date
    #[must_use]
    pub fn with_partition(mut self, interval: Interval) -> Self {
        self.partition = Some(interval);
        self
    }

    /// Set progress poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check if partitions run on a worker pool
    pub fn is_parallel(&self) -> bool {
        self.threads > 1
    }

    /// Query for the whole read: filter plus both date ranges
    pub fn base_query(&self) -> EncodedQuery {
        let query = match &self.filter {
            Some(filter) => EncodedQuery::with_filter(filter.as_str()),
            None => EncodedQuery::new(),
        };
        query
            .created_within(&self.created)
            .updated_within(&self.updated)
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::invalid_value("poll_interval", "must be positive"));
        }
        if self.pagination == Pagination::BlindScan && self.partition.is_some() {
            return Err(Error::invalid_value(
                "partition",
                "blind_scan cannot verify completeness and may not be partitioned",
            ));
        }
        Ok(())
    }
}
