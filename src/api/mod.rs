//! Collaborator interfaces
//!
//! The read engine talks to exactly two outside parties: a [`TableApi`]
//! that answers key-listing, record and statistics calls for one wire
//! protocol, and a [`RecordSink`] that receives each page of records.
//!
//! # Overview
//!
//! - `TableApi` - one implementation per wire protocol
//! - `RecordSink` - destination for record batches; must tolerate concurrent calls
//! - `ReadContext` - request-scoped context passed explicitly to every call
//! - `PageRequest` - a query plus the window of rows to return

mod context;
mod types;

pub use context::ReadContext;
pub use types::{KeySource, PageRequest, PageWindow};

use crate::error::Result;
use crate::query::EncodedQuery;
use crate::types::{KeySet, RecordBatch, TableStats};
use async_trait::async_trait;

/// Remote table access for one wire protocol
#[async_trait]
pub trait TableApi: Send + Sync {
    /// Largest key list the primary key-listing call can return before it
    /// silently truncates, if it has such a cap
    fn key_listing_cap(&self) -> Option<usize> {
        None
    }

    /// List every key matching `query`
    async fn fetch_keys(
        &self,
        ctx: &ReadContext,
        query: &EncodedQuery,
        source: KeySource,
    ) -> Result<KeySet>;

    /// Fetch one page of records
    async fn fetch_records(&self, ctx: &ReadContext, request: &PageRequest)
        -> Result<RecordBatch>;

    /// Authoritative row count, plus min/max creation date when requested
    async fn fetch_stats(
        &self,
        ctx: &ReadContext,
        query: &EncodedQuery,
        include_dates: bool,
    ) -> Result<TableStats>;
}

/// Destination for extracted records.
///
/// Called once per page. With more than one thread, calls arrive
/// concurrently from different partitions and in no particular order.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Accept one page of records
    async fn accept(&self, ctx: &ReadContext, batch: RecordBatch) -> Result<()>;
}
