//! Pagination module
//!
//! Supports: Offset-Window, Key-Slice, Blind-Scan
//!
//! # Overview
//!
//! Each strategy walks one query to exhaustion, handing every page to the
//! record sink in ascending offset or key-slice order:
//!
//! - **Offset-Window** requests `limit = page_size` rows at a growing offset
//!   and stops on a short page.
//! - **Key-Slice** lists every matching key first (verified for completeness
//!   against the statistics count), then fetches the records one contiguous
//!   slice of keys at a time. Termination is exact.
//! - **Blind-Scan** walks fixed row-number windows without listing keys. It
//!   cannot tell the end of the data from a page thinned out by access
//!   control, so it silently under-reads when rows are hidden. Only select
//!   it for small tables where access control does not apply.

mod strategies;
mod types;
mod verify;

pub use strategies::Walker;
pub use types::{Pagination, PaginationState, WalkSummary};
pub use verify::{CompletenessVerifier, VerifiedKeys};
