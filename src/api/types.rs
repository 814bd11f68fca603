//! Request types passed to a `TableApi`

use crate::query::EncodedQuery;
use crate::types::KeySet;

/// Which key-listing protocol to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySource {
    /// The normal key-listing call (may be capped)
    #[default]
    Primary,
    /// A slower call that does not share the primary cap
    Alternate,
}

/// Rows of the result set to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWindow {
    /// `limit` rows starting at `offset`
    Offset { offset: u64, limit: u64 },
    /// Row numbers `[first, last)`
    Rows { first: u64, last: u64 },
    /// Every row matching the query
    All,
}

impl PageWindow {
    /// Maximum rows this window can return, if bounded
    pub fn limit(&self) -> Option<u64> {
        match self {
            Self::Offset { limit, .. } => Some(*limit),
            Self::Rows { first, last } => Some(last.saturating_sub(*first)),
            Self::All => None,
        }
    }
}

/// One page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Predicate for the page
    pub query: EncodedQuery,
    /// Window within the predicate's result set
    pub window: PageWindow,
}

impl PageRequest {
    /// Offset/limit window
    pub fn offset(query: EncodedQuery, offset: u64, limit: u64) -> Self {
        Self {
            query,
            window: PageWindow::Offset { offset, limit },
        }
    }

    /// Row-number window
    pub fn rows(query: EncodedQuery, first: u64, last: u64) -> Self {
        Self {
            query,
            window: PageWindow::Rows { first, last },
        }
    }

    /// Every row of a key-restricted query
    pub fn keys(query: EncodedQuery, keys: KeySet) -> Self {
        Self {
            query: query.with_keys(keys),
            window: PageWindow::All,
        }
    }
}
