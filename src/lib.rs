// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # rowharvest
//!
//! Complete, optionally parallel extraction of remote tables exposed through
//! paginated, access-controlled query protocols.
//!
//! ## Features
//!
//! - **Three pagination strategies**: offset windows, verified key slices and blind row scans
//! - **Completeness verification**: capped key listings are checked against the row count,
//!   with one fallback to an alternate key protocol
//! - **Date partitioning**: calendar-aligned partitions, newest first
//! - **Bounded parallelism**: a fixed worker pool with progress logging and cancellation
//! - **Throttling**: token-bucket rate limiting around any protocol
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rowharvest::{load_config, Extractor, MemorySink, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("extract.yaml")?;
//!     let api = Arc::new(MyProtocol::connect().await?);
//!     let sink = Arc::new(MemorySink::new());
//!
//!     let extractor = Extractor::from_config(api, sink.clone(), &config)?;
//!     let report = extractor.read().await?;
//!     println!("{} rows", report.records());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Extractor                             │
//! │   stats → DatePartitioner → PartitionScheduler → TableReader    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴───────────┬─────────────────────┐
//! │  Pagination  │   Completeness Verifier   │    Collaborators    │
//! ├──────────────┼───────────────────────────┼─────────────────────┤
//! │ Offset-Window│ cap check vs row count    │ TableApi (protocol) │
//! │ Key-Slice    │ one alternate re-fetch    │ RecordSink          │
//! │ Blind-Scan   │                           │ ThrottledApi        │
//! └──────────────┴───────────────────────────┴─────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Calendar interval arithmetic
pub mod interval;

/// Date range partitioning
pub mod partition;

/// Encoded query predicates
pub mod query;

/// Collaborator traits and request context
pub mod api;

/// Request rate limiting
pub mod throttle;

/// Pagination strategies and completeness verification
pub mod pagination;

/// Table reader
pub mod reader;

/// Extractor and partition scheduler
pub mod engine;

/// Extraction configuration
pub mod config;

/// Reference record sink
pub mod sink;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use api::{ReadContext, RecordSink, TableApi};
pub use config::{load_config, load_config_from_str, ExtractConfig};
pub use engine::{ExtractReport, Extractor, Progress};
pub use pagination::Pagination;
pub use reader::{ReaderOptions, TableReader};
pub use sink::MemorySink;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
