//! Table reader module
//!
//! One reader type for every protocol: the pagination strategy is a value,
//! and the remote protocol is an injected `TableApi`.
//!
//! # Overview
//!
//! A `TableReader` moves through `created -> initializing -> ready ->
//! running -> complete | failed`. [`TableReader::initialize`] fetches the
//! authoritative row count, [`TableReader::run`] walks every page into the
//! sink. Calling `run` before `initialize` is an error.
//!
//! Partition readers come from [`TableReader::for_partition`]: they share
//! the parent's API, sink and settings, with the created-on filter narrowed
//! to one date partition and their own metrics.

mod metrics;
mod types;

pub use metrics::{MetricsSnapshot, ReaderMetrics};
pub use types::{ReaderOptions, ReaderState, DEFAULT_POLL_INTERVAL};

use crate::api::{ReadContext, RecordSink, TableApi};
use crate::error::{Error, Result};
use crate::pagination::{Pagination, WalkSummary, Walker};
use crate::partition::DatePartition;
use crate::query::EncodedQuery;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// Reads one query to completion with one pagination strategy
pub struct TableReader {
    api: Arc<dyn TableApi>,
    sink: Arc<dyn RecordSink>,
    ctx: ReadContext,
    pagination: Pagination,
    page_size: usize,
    query: EncodedQuery,
    metrics: Arc<ReaderMetrics>,
    expected: Option<u64>,
    state: ReaderState,
}

impl TableReader {
    /// Create a reader for the whole query described by `options`
    pub fn new(
        api: Arc<dyn TableApi>,
        sink: Arc<dyn RecordSink>,
        ctx: ReadContext,
        options: &ReaderOptions,
    ) -> Result<Self> {
        if options.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        Ok(Self {
            api,
            sink,
            ctx,
            pagination: options.pagination,
            page_size: options.page_size,
            query: options.base_query(),
            metrics: Arc::new(ReaderMetrics::new()),
            expected: None,
            state: ReaderState::Created,
        })
    }

    /// Derive a reader scoped to one date partition
    pub fn for_partition(&self, partition: &DatePartition) -> TableReader {
        Self {
            api: Arc::clone(&self.api),
            sink: Arc::clone(&self.sink),
            ctx: self.ctx.for_partition(partition.name()),
            pagination: self.pagination,
            page_size: self.page_size,
            query: self.query.clone().created_within(&partition.range()),
            metrics: Arc::new(ReaderMetrics::new()),
            expected: None,
            state: ReaderState::Created,
        }
    }

    /// Name used in logs: the partition name or the table
    pub fn name(&self) -> &str {
        self.ctx.label()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// The query this reader walks
    pub fn query(&self) -> &EncodedQuery {
        &self.query
    }

    /// Request context
    pub fn context(&self) -> &ReadContext {
        &self.ctx
    }

    /// Progress counters, shared with progress reporting
    pub fn metrics(&self) -> &Arc<ReaderMetrics> {
        &self.metrics
    }

    /// Authoritative row count, once initialized
    pub fn expected(&self) -> Option<u64> {
        self.expected
    }

    /// Fetch the authoritative row count.
    ///
    /// Key-slice readers take their count from the verified key list
    /// instead, so they skip the statistics call.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state != ReaderState::Created {
            return Err(Error::invalid_state(format!(
                "cannot initialize '{}' while {}",
                self.name(),
                self.state
            )));
        }
        self.state = ReaderState::Initializing;

        if self.pagination == Pagination::KeySlice {
            self.state = ReaderState::Ready;
            return Ok(());
        }

        let stats = self
            .ctx
            .until_cancelled(self.api.fetch_stats(&self.ctx, &self.query, false))
            .await;
        match stats {
            Ok(stats) => {
                debug!("{}: {} rows expected", self.name(), stats.count);
                self.expected = Some(stats.count);
                self.metrics.set_expected(stats.count);
                self.state = ReaderState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = ReaderState::Failed;
                Err(e)
            }
        }
    }

    /// Walk every page into the sink
    pub async fn run(&mut self) -> Result<WalkSummary> {
        match self.state {
            ReaderState::Ready => {}
            ReaderState::Created | ReaderState::Initializing => {
                return Err(Error::not_initialized(self.name()));
            }
            state => {
                return Err(Error::invalid_state(format!(
                    "cannot run '{}' while {state}",
                    self.name()
                )));
            }
        }
        self.state = ReaderState::Running;

        let span = info_span!(
            "read",
            table = %self.ctx.table(),
            partition = self.ctx.partition().unwrap_or("-"),
            pagination = %self.pagination,
        );
        let walker = Walker::new(
            self.api.as_ref(),
            self.sink.as_ref(),
            &self.ctx,
            &self.metrics,
            self.page_size,
        );
        let result = match walker {
            Ok(walker) => {
                walker
                    .with_expected(self.expected)
                    .walk(self.pagination, &self.query)
                    .instrument(span)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(summary) => {
                self.state = ReaderState::Complete;
                info!(
                    "{}: read {} rows in {} requests",
                    self.name(),
                    summary.records,
                    summary.requests
                );
                Ok(summary)
            }
            Err(e) => {
                self.state = ReaderState::Failed;
                Err(e)
            }
        }
    }

    /// Initialize, then run
    pub async fn read(&mut self) -> Result<WalkSummary> {
        self.initialize().await?;
        self.run().await
    }
}

impl std::fmt::Debug for TableReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableReader")
            .field("name", &self.name())
            .field("pagination", &self.pagination)
            .field("page_size", &self.page_size)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
