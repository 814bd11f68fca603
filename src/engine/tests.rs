//! Tests for engine module

use super::*;
use crate::api::{KeySource, PageRequest};
use crate::pagination::Pagination;
use crate::query::EncodedQuery;
use crate::sink::MemorySink;
use crate::test_support::{utc, MockTable};
use crate::types::{DateTimeRange, KeySet, RecordBatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Two rows in every month of 2019
fn monthly_dates() -> Vec<DateTime<Utc>> {
    (1..=12)
        .flat_map(|m| [utc(2019, m, 3), utc(2019, m, 17)])
        .collect()
}

fn month_names() -> Vec<String> {
    (1..=12).rev().map(|m| format!("M2019-{m:02}")).collect()
}

fn extractor(api: Arc<dyn TableApi>, sink: Arc<MemorySink>, options: ReaderOptions) -> Extractor {
    Extractor::new(api, sink, ReadContext::new("incident"), options).unwrap()
}

fn monthly(threads: usize) -> ReaderOptions {
    ReaderOptions::default()
        .with_page_size(10)
        .with_threads(threads)
        .with_partition(Interval::Month)
}

async fn distinct_keys(sink: &MemorySink) -> HashSet<String> {
    sink.records()
        .await
        .iter()
        .filter_map(|r| r.get("sys_id").and_then(|v| v.as_str()).map(String::from))
        .collect()
}

// ============================================================================
// TaskState / Progress Tests
// ============================================================================

#[test]
fn test_task_state_terminal() {
    assert!(!TaskState::Pending.is_terminal());
    assert!(!TaskState::Running.is_terminal());
    assert!(TaskState::Done.is_terminal());
    assert!(TaskState::Failed.is_terminal());
    assert_eq!(TaskState::default(), TaskState::Pending);
}

#[test]
fn test_progress_remaining() {
    let progress = Progress {
        total: 12,
        done: 7,
        failed: 1,
        running: 3,
        ..Progress::default()
    };
    assert_eq!(progress.remaining(), 4);
    assert!(!progress.is_finished());
    assert!(progress.to_string().starts_with("4/12 partitions remaining"));
}

#[test]
fn test_extractor_rejects_invalid_options() {
    let options = ReaderOptions::new(Pagination::BlindScan).with_partition(Interval::Day);
    let result = Extractor::new(
        Arc::new(MockTable::with_rows(1)),
        Arc::new(MemorySink::new()),
        ReadContext::new("t"),
        options,
    );
    assert!(result.is_err());
}

// ============================================================================
// Whole-Table Tests
// ============================================================================

#[tokio::test]
async fn test_whole_table_read() {
    let sink = Arc::new(MemorySink::new());
    let options = ReaderOptions::default().with_page_size(7);
    let extractor = extractor(Arc::new(MockTable::with_rows(20)), Arc::clone(&sink), options);

    let report = extractor.read().await.unwrap();

    assert_eq!(report.table, "incident");
    assert_eq!(report.records(), 20);
    assert_eq!(report.partitions.len(), 1);
    assert_eq!(report.partitions[0].name, "incident");
    assert_eq!(report.partitions[0].state, TaskState::Done);
    assert_eq!(sink.record_count().await, 20);

    let progress = extractor.progress();
    assert_eq!(progress.total, 1);
    assert_eq!(progress.done, 1);
    assert!(progress.is_finished());
    assert_eq!(progress.metrics.processed, 20);
}

#[tokio::test]
async fn test_plan_requires_partition() {
    let extractor = extractor(
        Arc::new(MockTable::with_rows(1)),
        Arc::new(MemorySink::new()),
        ReaderOptions::default(),
    );
    assert!(matches!(
        extractor.plan().await,
        Err(Error::MissingConfigField { .. })
    ));
}

// ============================================================================
// Partitioned Tests
// ============================================================================

#[tokio::test]
async fn test_plan_covers_stats_range_newest_first() {
    let extractor = extractor(
        Arc::new(MockTable::with_dates(&monthly_dates())),
        Arc::new(MemorySink::new()),
        monthly(4),
    );

    let plan = extractor.plan().await.unwrap();
    let names: Vec<String> = plan.iter().map(DatePartition::name).collect();
    assert_eq!(names, month_names());
    assert_eq!(plan[0].end(), utc(2020, 1, 1));
}

#[tokio::test]
async fn test_plan_intersects_configured_range() {
    let created = DateTimeRange::new(Some(utc(2019, 10, 1)), None).unwrap();
    let extractor = extractor(
        Arc::new(MockTable::with_dates(&monthly_dates())),
        Arc::new(MemorySink::new()),
        monthly(1).with_created(created),
    );

    let names: Vec<String> = extractor
        .plan()
        .await
        .unwrap()
        .iter()
        .map(DatePartition::name)
        .collect();
    assert_eq!(names, vec!["M2019-12", "M2019-11", "M2019-10"]);
}

#[tokio::test]
async fn test_partition_at_exact_max_instant_is_read() {
    // The latest row sits on a month boundary; it must still fall inside a partition
    let dates = [utc(2019, 11, 5), utc(2019, 12, 1)];
    let sink = Arc::new(MemorySink::new());
    let extractor = extractor(
        Arc::new(MockTable::with_dates(&dates)),
        Arc::clone(&sink),
        monthly(1),
    );

    let report = extractor.read().await.unwrap();
    assert_eq!(report.records(), 2);
    assert_eq!(report.partitions[0].name, "M2019-12");
}

#[tokio::test]
async fn test_parallel_read_delivers_every_row_once() {
    let sink = Arc::new(MemorySink::new());
    let extractor = extractor(
        Arc::new(MockTable::with_dates(&monthly_dates())),
        Arc::clone(&sink),
        monthly(4),
    );

    let report = extractor.read().await.unwrap();

    assert_eq!(report.records(), 24);
    assert_eq!(report.metrics.expected, 24);
    assert_eq!(sink.record_count().await, 24);
    assert_eq!(distinct_keys(&sink).await.len(), 24);
    let names: Vec<String> = report.partitions.iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, month_names());
    assert!(report.partitions.iter().all(|p| p.state == TaskState::Done));

    let progress = extractor.progress();
    assert_eq!(progress.total, 12);
    assert_eq!(progress.done, 12);
    assert_eq!(progress.running, 0);
}

#[tokio::test]
async fn test_sequential_read_runs_newest_first() {
    let sink = Arc::new(MemorySink::new());
    let extractor = extractor(
        Arc::new(MockTable::with_dates(&monthly_dates())),
        Arc::clone(&sink),
        monthly(1),
    );

    extractor.read().await.unwrap();

    let order: Vec<String> = sink
        .deliveries()
        .await
        .iter()
        .filter_map(|d| d.partition.clone())
        .collect();
    assert_eq!(order, month_names());
}

#[tokio::test]
async fn test_parallel_failure_surfaces_after_siblings_finish() {
    let mut api = MockTable::with_dates(&monthly_dates());
    api.fail_partition_start = Some(utc(2019, 6, 1));
    let sink = Arc::new(MemorySink::new());
    let extractor = extractor(Arc::new(api), Arc::clone(&sink), monthly(3));

    let err = extractor.read().await.unwrap_err();

    match &err {
        Error::Partition {
            partition,
            processed,
            expected,
            source,
        } => {
            assert_eq!(partition, "M2019-06");
            assert_eq!(*processed, 0);
            assert_eq!(*expected, 2);
            assert!(matches!(**source, Error::Authorization { .. }));
        }
        other => panic!("Expected Partition error, got {other}"),
    }
    // Siblings ran to completion and kept what they wrote
    assert_eq!(sink.record_count().await, 22);

    let progress = extractor.progress();
    assert_eq!(progress.failed, 1);
    assert_eq!(progress.done, 11);
    assert!(progress.is_finished());
}

#[tokio::test]
async fn test_sequential_failure_stops_remaining_partitions() {
    let mut api = MockTable::with_dates(&monthly_dates());
    api.fail_partition_start = Some(utc(2019, 12, 1));
    let sink = Arc::new(MemorySink::new());
    let extractor = extractor(Arc::new(api), Arc::clone(&sink), monthly(0));

    let err = extractor.read().await.unwrap_err();

    assert!(err.to_string().starts_with("Partition 'M2019-12' failed"));
    assert_eq!(sink.record_count().await, 0);
    let progress = extractor.progress();
    assert_eq!(progress.failed, 1);
    assert_eq!(progress.done, 0);
    assert_eq!(progress.remaining(), 11);
}

#[tokio::test]
async fn test_empty_table_has_no_partitions() {
    let sink = Arc::new(MemorySink::new());
    let extractor = extractor(Arc::new(MockTable::with_rows(0)), Arc::clone(&sink), monthly(4));

    let report = extractor.read().await.unwrap();
    assert!(report.partitions.is_empty());
    assert_eq!(report.records(), 0);
    assert!(extractor.progress().is_finished());
}

#[tokio::test]
async fn test_partitioned_key_slice_reports_fallback() {
    let mut api = MockTable::with_dates(&monthly_dates());
    api.key_cap = Some(1);
    let sink = Arc::new(MemorySink::new());
    let options = ReaderOptions::new(Pagination::KeySlice)
        .with_threads(2)
        .with_partition(Interval::Quarter);
    let extractor = extractor(Arc::new(api), Arc::clone(&sink), options);

    let report = extractor.read().await.unwrap();

    assert_eq!(report.partitions.len(), 4);
    assert!(report.fallback_used);
    assert_eq!(distinct_keys(&sink).await.len(), 24);
}

#[tokio::test]
async fn test_cancelled_read() {
    let extractor = extractor(
        Arc::new(MockTable::with_dates(&monthly_dates())),
        Arc::new(MemorySink::new()),
        monthly(4),
    );
    extractor.cancel();

    let err = extractor.read().await.unwrap_err();
    assert!(err.is_cancelled());
}

// ============================================================================
// Worker Pool Bound
// ============================================================================

/// Tracks how many record fetches run at once
struct GaugeApi {
    inner: MockTable,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl TableApi for GaugeApi {
    async fn fetch_keys(
        &self,
        ctx: &ReadContext,
        query: &EncodedQuery,
        source: KeySource,
    ) -> Result<KeySet> {
        self.inner.fetch_keys(ctx, query, source).await
    }

    async fn fetch_records(&self, ctx: &ReadContext, request: &PageRequest) -> Result<RecordBatch> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let batch = self.inner.fetch_records(ctx, request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        batch
    }

    async fn fetch_stats(
        &self,
        ctx: &ReadContext,
        query: &EncodedQuery,
        include_dates: bool,
    ) -> Result<TableStats> {
        self.inner.fetch_stats(ctx, query, include_dates).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_is_bounded() {
    let api = Arc::new(GaugeApi {
        inner: MockTable::with_dates(&monthly_dates()),
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let sink = Arc::new(MemorySink::new());
    let extractor = extractor(
        Arc::clone(&api) as Arc<dyn TableApi>,
        Arc::clone(&sink),
        monthly(3).with_poll_interval(Duration::from_millis(1)),
    );

    let report = extractor.read().await.unwrap();

    assert_eq!(report.records(), 24);
    let peak = api.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 3, "peak concurrency {peak}");
}

// ============================================================================
// Worker Panic
// ============================================================================

/// Stats succeed, every record fetch panics
struct PanickingApi;

#[async_trait]
impl TableApi for PanickingApi {
    async fn fetch_keys(
        &self,
        _ctx: &ReadContext,
        _query: &EncodedQuery,
        _source: KeySource,
    ) -> Result<KeySet> {
        Ok(KeySet::default())
    }

    async fn fetch_records(&self, _ctx: &ReadContext, _request: &PageRequest) -> Result<RecordBatch> {
        panic!("record decoder bug");
    }

    async fn fetch_stats(
        &self,
        _ctx: &ReadContext,
        _query: &EncodedQuery,
        _include_dates: bool,
    ) -> Result<TableStats> {
        Ok(TableStats::count(5))
    }
}

#[tokio::test]
async fn test_panicked_partition_is_marked_failed() {
    let api: Arc<dyn TableApi> = Arc::new(PanickingApi);
    let sink: Arc<dyn RecordSink> = Arc::new(MemorySink::new());
    let options = ReaderOptions::default().with_threads(2);
    let root = ReadContext::new("incident");

    let mut scheduler = PartitionScheduler::new(2, Duration::from_millis(10));
    let handles: Vec<PartitionHandle> = ["M2019-12", "M2019-11"]
        .into_iter()
        .map(|name| {
            let reader = TableReader::new(
                Arc::clone(&api),
                Arc::clone(&sink),
                root.for_partition(name),
                &options,
            )
            .unwrap();
            scheduler.submit(reader)
        })
        .collect();

    let err = scheduler.run().await.unwrap_err();

    assert!(err.to_string().contains("Partition worker failed"), "{err}");
    for handle in &handles {
        assert_eq!(handle.state(), TaskState::Failed, "{}", handle.name());
    }
}
