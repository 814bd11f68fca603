//! Pagination strategy implementations
//!
//! One `Walker` runs any strategy against a `TableApi`, delivering pages to
//! a `RecordSink` strictly in order.

use super::types::{Pagination, PaginationState, WalkSummary};
use super::verify::CompletenessVerifier;
use crate::api::{PageRequest, ReadContext, RecordSink, TableApi};
use crate::error::{Error, Result};
use crate::query::EncodedQuery;
use crate::reader::ReaderMetrics;
use crate::types::RecordBatch;
use tracing::{debug, warn};

/// Walks one query to exhaustion
pub struct Walker<'a> {
    api: &'a dyn TableApi,
    sink: &'a dyn RecordSink,
    ctx: &'a ReadContext,
    metrics: &'a ReaderMetrics,
    page_size: usize,
    expected: Option<u64>,
}

impl<'a> Walker<'a> {
    /// Create a walker; `page_size` must be positive
    pub fn new(
        api: &'a dyn TableApi,
        sink: &'a dyn RecordSink,
        ctx: &'a ReadContext,
        metrics: &'a ReaderMetrics,
        page_size: usize,
    ) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        Ok(Self {
            api,
            sink,
            ctx,
            metrics,
            page_size,
            expected: None,
        })
    }

    /// Supply the authoritative row count from a statistics call
    #[must_use]
    pub fn with_expected(mut self, expected: Option<u64>) -> Self {
        self.expected = expected;
        self
    }

    /// Run `pagination` over `query`
    pub async fn walk(&self, pagination: Pagination, query: &EncodedQuery) -> Result<WalkSummary> {
        match pagination {
            Pagination::OffsetWindow => self.offset_window(query).await,
            Pagination::KeySlice => self.key_slice(query).await,
            Pagination::BlindScan => self.blind_scan(query).await,
        }
    }

    // ========================================================================
    // Offset-Window
    // ========================================================================

    async fn offset_window(&self, query: &EncodedQuery) -> Result<WalkSummary> {
        let mut state = PaginationState::new();
        let limit = self.page_size as u64;
        let query = query.clone().order_by_key();

        if self.expected == Some(0) {
            debug!("{}: row count is zero, skipping query", self.ctx.label());
            return Ok(self.summary(&state, false));
        }

        let mut expected = self.expected;
        let mut warned = false;
        while !state.done {
            let request = PageRequest::offset(query.clone(), state.offset, limit);
            let batch = self.fetch(&request).await?;
            let rows = batch.len() as u64;
            state.record_page(rows);
            self.deliver(batch).await?;
            state.add_offset(rows);

            if rows < limit {
                state.mark_done();
            } else if let Some(count) = expected {
                // A full page at the expected count ends the walk only if the count still holds
                if state.total_fetched >= count {
                    let current = self.recount(&query).await?;
                    if current > state.total_fetched {
                        warn!(
                            "{}: row count grew from {} to {} during the read, continuing at offset {}",
                            self.ctx.label(),
                            count,
                            current,
                            state.offset
                        );
                        expected = Some(current);
                        self.metrics.set_expected(current);
                    } else {
                        state.mark_done();
                    }
                }
            }

            if let Some(expected) = expected {
                if state.total_fetched > expected && !warned {
                    warned = true;
                    warn!(
                        "{}: read {} rows but expected {}",
                        self.ctx.label(),
                        state.total_fetched,
                        expected
                    );
                }
            }
        }

        let mut summary = self.summary(&state, false);
        summary.expected = expected;
        Ok(summary)
    }

    async fn recount(&self, query: &EncodedQuery) -> Result<u64> {
        let stats = self
            .ctx
            .until_cancelled(self.api.fetch_stats(self.ctx, query, false))
            .await?;
        Ok(stats.count)
    }

    // ========================================================================
    // Key-Slice
    // ========================================================================

    async fn key_slice(&self, query: &EncodedQuery) -> Result<WalkSummary> {
        let mut state = PaginationState::new();
        let query = query.clone().order_by_key();

        let verified = CompletenessVerifier::new(self.api, self.ctx)
            .fetch_keys(&query)
            .await?;
        let keys = verified.keys;
        self.metrics.set_expected(keys.len() as u64);
        debug!(
            "{}: {} keys in {} slices",
            self.ctx.label(),
            keys.len(),
            keys.chunks(self.page_size).len()
        );

        for slice in keys.chunks(self.page_size) {
            let wanted = slice.len();
            let request = PageRequest::keys(query.clone(), slice);
            let batch = self.fetch(&request).await?;
            if batch.len() < wanted {
                debug!(
                    "{}: slice of {} keys returned {} rows",
                    self.ctx.label(),
                    wanted,
                    batch.len()
                );
            }
            state.record_page(batch.len() as u64);
            self.deliver(batch).await?;
        }
        state.mark_done();

        let mut summary = self.summary(&state, verified.fallback_used);
        summary.expected = Some(keys.len() as u64);
        Ok(summary)
    }

    // ========================================================================
    // Blind-Scan
    // ========================================================================

    async fn blind_scan(&self, query: &EncodedQuery) -> Result<WalkSummary> {
        let mut state = PaginationState::new();
        let size = self.page_size as u64;
        let query = query.clone().order_by_key();

        while !state.done {
            let first = state.offset;
            let request = PageRequest::rows(query.clone(), first, first + size);
            let batch = self.fetch(&request).await?;
            let rows = batch.len() as u64;
            state.record_page(rows);
            self.deliver(batch).await?;
            // A short window is taken as the end, even if access control thinned it
            if rows < size {
                state.mark_done();
            }
            state.add_offset(size);
        }

        Ok(self.summary(&state, false))
    }

    // ========================================================================
    // Shared steps
    // ========================================================================

    async fn fetch(&self, request: &PageRequest) -> Result<RecordBatch> {
        self.ctx
            .until_cancelled(self.api.fetch_records(self.ctx, request))
            .await
    }

    async fn deliver(&self, batch: RecordBatch) -> Result<()> {
        if self.ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let rows = batch.len() as u64;
        if rows > 0 {
            self.sink.accept(self.ctx, batch).await?;
        }
        self.metrics.add_page(rows);
        Ok(())
    }

    fn summary(&self, state: &PaginationState, fallback_used: bool) -> WalkSummary {
        WalkSummary {
            requests: state.requests,
            records: state.total_fetched,
            expected: self.expected,
            fallback_used,
        }
    }
}
