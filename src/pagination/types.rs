//! Pagination types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Pagination strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pagination {
    /// Offset + limit windows, stopping on a short page
    #[default]
    OffsetWindow,
    /// Verified key list, fetched in contiguous slices
    KeySlice,
    /// Row-number windows without a key list; may under-read under access control
    BlindScan,
}

impl Pagination {
    /// Protocol-specific default page size
    pub fn default_page_size(&self) -> usize {
        match self {
            Self::OffsetWindow => 1000,
            Self::KeySlice | Self::BlindScan => 200,
        }
    }

    /// Whether the strategy guarantees every accessible row is read
    pub fn guarantees_completeness(&self) -> bool {
        !matches!(self, Self::BlindScan)
    }

    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            Self::OffsetWindow => "offset_window",
            Self::KeySlice => "key_slice",
            Self::BlindScan => "blind_scan",
        }
    }
}

impl fmt::Display for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pagination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "offset_window" | "offset" => Ok(Self::OffsetWindow),
            "key_slice" | "keys" => Ok(Self::KeySlice),
            "blind_scan" | "blind" => Ok(Self::BlindScan),
            other => Err(Error::invalid_value(
                "pagination",
                format!("unknown strategy '{other}'"),
            )),
        }
    }
}

/// Tracks position during one walk
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Next row offset (offset-window and blind-scan)
    pub offset: u64,
    /// Requests issued so far
    pub requests: u64,
    /// Rows fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fetched page
    pub fn record_page(&mut self, rows: u64) {
        self.requests += 1;
        self.total_fetched += rows;
    }

    /// Advance the offset
    pub fn add_offset(&mut self, amount: u64) {
        self.offset += amount;
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

/// Outcome of one completed walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalkSummary {
    /// Record requests issued
    pub requests: u64,
    /// Rows delivered to the sink
    pub records: u64,
    /// Row count the walk expected, when known
    pub expected: Option<u64>,
    /// Whether the key list had to be re-fetched with the alternate protocol
    pub fallback_used: bool,
}
