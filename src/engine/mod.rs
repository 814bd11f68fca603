//! Execution engine module
//!
//! Top-level read orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Extractor` - Reads one table, whole or partitioned by creation date
//! - `PartitionScheduler` - Runs partition readers sequentially or on a worker pool
//! - `Progress` / `ExtractReport` - Progress snapshots and the final report
//!
//! A partitioned read first asks the statistics endpoint for the row count
//! and creation-date bounds, splits that range into newest-first calendar
//! partitions and hands one reader per partition to the scheduler.

mod scheduler;
mod types;

pub use scheduler::PartitionScheduler;
pub use types::{ExtractReport, PartitionHandle, PartitionReport, Progress, TaskState};

use crate::api::{ReadContext, RecordSink, TableApi};
use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::partition::{DatePartition, DatePartitioner};
use crate::reader::{ReaderOptions, TableReader};
use crate::throttle::ThrottledApi;
use crate::types::TableStats;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, info_span, Instrument};

/// Reads one table into a sink
pub struct Extractor {
    api: Arc<dyn TableApi>,
    sink: Arc<dyn RecordSink>,
    ctx: ReadContext,
    options: ReaderOptions,
    handles: Mutex<Vec<PartitionHandle>>,
}

impl Extractor {
    /// Create an extractor
    pub fn new(
        api: Arc<dyn TableApi>,
        sink: Arc<dyn RecordSink>,
        ctx: ReadContext,
        options: ReaderOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            api,
            sink,
            ctx,
            options,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Create an extractor from a loaded configuration, throttling `api`
    /// when the configuration sets a rate limit
    pub fn from_config(
        api: Arc<dyn TableApi>,
        sink: Arc<dyn RecordSink>,
        config: &ExtractConfig,
    ) -> Result<Self> {
        config.validate()?;
        let api: Arc<dyn TableApi> = match &config.rate_limit {
            Some(limit) => Arc::new(ThrottledApi::new(api, limit)),
            None => api,
        };
        Self::new(api, sink, config.read_context(), config.reader_options()?)
    }

    /// Reader settings
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Root request context
    pub fn context(&self) -> &ReadContext {
        &self.ctx
    }

    /// Cancel the read; in-flight fetches abort and no further pages are delivered
    pub fn cancel(&self) {
        info!("{}: cancelling read", self.ctx.table());
        self.ctx.cancel();
    }

    /// Current progress, safe to call while `read` runs
    pub fn progress(&self) -> Progress {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let mut progress = Progress {
            total: handles.len(),
            ..Progress::default()
        };
        for handle in handles.iter() {
            match handle.state() {
                TaskState::Done => progress.done += 1,
                TaskState::Failed => progress.failed += 1,
                TaskState::Running => progress.running += 1,
                TaskState::Pending => {}
            }
            progress.metrics += handle.metrics();
        }
        progress
    }

    /// Partitions a partitioned read would run, newest first
    pub async fn plan(&self) -> Result<Vec<DatePartition>> {
        let interval = self
            .options
            .partition
            .ok_or_else(|| Error::missing_field("partition"))?;
        self.partitions(interval).await
    }

    /// Read the whole table into the sink
    pub async fn read(&self) -> Result<ExtractReport> {
        let started = Instant::now();
        let span = info_span!("extract", table = %self.ctx.table());
        let partitions = self.read_all().instrument(span).await?;

        let report = ExtractReport {
            table: self.ctx.table().to_string(),
            metrics: partitions.iter().map(|p| p.metrics).sum(),
            fallback_used: partitions.iter().any(|p| p.fallback_used),
            partitions,
            duration: started.elapsed(),
        };
        info!(
            "{}: read {} rows from {} partitions in {:.1}s",
            report.table,
            report.records(),
            report.partitions.len(),
            report.duration.as_secs_f64()
        );
        Ok(report)
    }

    async fn read_all(&self) -> Result<Vec<PartitionReport>> {
        let root = TableReader::new(
            Arc::clone(&self.api),
            Arc::clone(&self.sink),
            self.ctx.clone(),
            &self.options,
        )?;
        match self.options.partition {
            None => self.read_whole(root).await,
            Some(interval) => self.read_partitioned(&root, interval).await,
        }
    }

    async fn read_whole(&self, mut reader: TableReader) -> Result<Vec<PartitionReport>> {
        let (tx, rx) = watch::channel(TaskState::Running);
        self.track(vec![PartitionHandle::new(
            reader.name(),
            rx,
            Arc::clone(reader.metrics()),
        )]);

        let result = reader.read().await;
        let state = if result.is_ok() {
            TaskState::Done
        } else {
            TaskState::Failed
        };
        tx.send_replace(state);
        let summary = result?;

        Ok(vec![PartitionReport {
            name: reader.name().to_string(),
            state,
            metrics: reader.metrics().snapshot(),
            fallback_used: summary.fallback_used,
        }])
    }

    async fn read_partitioned(
        &self,
        root: &TableReader,
        interval: Interval,
    ) -> Result<Vec<PartitionReport>> {
        let partitions = self.partitions(interval).await?;

        let mut scheduler = PartitionScheduler::new(self.options.threads, self.options.poll_interval);
        for partition in &partitions {
            scheduler.submit(root.for_partition(partition));
        }
        self.track(scheduler.handles().to_vec());
        scheduler.run().await
    }

    async fn partitions(&self, interval: Interval) -> Result<Vec<DatePartition>> {
        let stats = self.stats().await?;
        if stats.count == 0 {
            info!("{}: no rows match, nothing to partition", self.ctx.table());
            return Ok(Vec::new());
        }

        let range = stats.created_range().intersect(&self.options.created);
        if !range.is_bounded() {
            return Err(Error::malformed(format!(
                "statistics for '{}' returned no creation date bounds",
                self.ctx.table()
            )));
        }
        let partitions = DatePartitioner::new(range, interval).partitions()?;
        info!(
            "{}: {} rows in {} by {} -> {} partitions",
            self.ctx.table(),
            stats.count,
            range,
            interval,
            partitions.len()
        );
        Ok(partitions)
    }

    async fn stats(&self) -> Result<TableStats> {
        let query = self.options.base_query();
        self.ctx
            .until_cancelled(self.api.fetch_stats(&self.ctx, &query, true))
            .await
    }

    fn track(&self, handles: Vec<PartitionHandle>) {
        *self.handles.lock().unwrap_or_else(PoisonError::into_inner) = handles;
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("table", &self.ctx.table())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
