//! Tests for reader module

use super::*;
use crate::interval::Interval;
use crate::sink::MemorySink;
use crate::test_support::{utc, MockTable};
use crate::types::DateTimeRange;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn reader(api: Arc<MockTable>, sink: Arc<MemorySink>, options: &ReaderOptions) -> TableReader {
    TableReader::new(api, sink, ReadContext::new("incident"), options).unwrap()
}

// ============================================================================
// ReaderOptions Tests
// ============================================================================

#[test]
fn test_options_defaults_follow_pagination() {
    assert_eq!(ReaderOptions::new(Pagination::OffsetWindow).page_size, 1000);
    assert_eq!(ReaderOptions::new(Pagination::KeySlice).page_size, 200);

    let options = ReaderOptions::default();
    assert_eq!(options.threads, 0);
    assert!(!options.is_parallel());
    assert_eq!(options.poll_interval, DEFAULT_POLL_INTERVAL);
}

#[test]
fn test_options_validate() {
    assert!(ReaderOptions::default().validate().is_ok());
    assert!(ReaderOptions::default().with_page_size(0).validate().is_err());
    assert!(ReaderOptions::default()
        .with_poll_interval(Duration::ZERO)
        .validate()
        .is_err());

    let err = ReaderOptions::new(Pagination::BlindScan)
        .with_partition(Interval::Month)
        .validate()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "partition"));
}

#[test]
fn test_base_query_combines_filter_and_ranges() {
    let created = DateTimeRange::between(utc(2019, 1, 1), utc(2020, 1, 1)).unwrap();
    let updated = DateTimeRange::new(Some(utc(2019, 6, 1)), None).unwrap();
    let query = ReaderOptions::default()
        .with_filter("active=true")
        .with_created(created)
        .with_updated(updated)
        .base_query();

    assert_eq!(query.filter(), Some("active=true"));
    assert_eq!(*query.created(), created);
    assert_eq!(*query.updated(), updated);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_run_before_initialize_fails() {
    let api = Arc::new(MockTable::with_rows(3));
    let mut reader = reader(api, Arc::new(MemorySink::new()), &ReaderOptions::default());

    let err = reader.run().await.unwrap_err();
    assert!(matches!(err, Error::NotInitialized { ref reader } if reader == "incident"));
    assert_eq!(reader.state(), ReaderState::Created);
}

#[tokio::test]
async fn test_initialize_twice_fails() {
    let api = Arc::new(MockTable::with_rows(3));
    let mut reader = reader(api, Arc::new(MemorySink::new()), &ReaderOptions::default());

    reader.initialize().await.unwrap();
    assert_eq!(reader.state(), ReaderState::Ready);
    assert!(matches!(
        reader.initialize().await,
        Err(Error::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_zero_page_size_rejected_at_construction() {
    let api = Arc::new(MockTable::with_rows(3));
    let options = ReaderOptions::default().with_page_size(0);
    let result = TableReader::new(api, Arc::new(MemorySink::new()), ReadContext::new("t"), &options);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_offset_read_completes() {
    let api = Arc::new(MockTable::with_rows(25));
    let sink = Arc::new(MemorySink::new());
    let options = ReaderOptions::default().with_page_size(10);
    let mut reader = reader(Arc::clone(&api), Arc::clone(&sink), &options);

    let summary = reader.read().await.unwrap();

    assert_eq!(reader.state(), ReaderState::Complete);
    assert_eq!(reader.expected(), Some(25));
    assert_eq!(summary.requests, 3);
    assert_eq!(sink.record_count().await, 25);
    assert_eq!(
        reader.metrics().snapshot(),
        MetricsSnapshot {
            expected: 25,
            processed: 25,
            pages: 3,
        }
    );
    assert_eq!(api.stats_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_key_slice_initialize_skips_stats() {
    let api = Arc::new(MockTable::with_rows(5));
    let options = ReaderOptions::new(Pagination::KeySlice).with_page_size(2);
    let mut reader = reader(Arc::clone(&api), Arc::new(MemorySink::new()), &options);

    reader.initialize().await.unwrap();
    assert_eq!(api.stats_calls.load(Ordering::SeqCst), 0);
    assert_eq!(reader.expected(), None);

    let summary = reader.run().await.unwrap();
    assert_eq!(summary.expected, Some(5));
    assert_eq!(reader.metrics().expected(), 5);
}

#[tokio::test]
async fn test_failed_read_marks_state() {
    let mut api = MockTable::with_rows(5);
    api.fail_partition_start = Some(utc(2019, 1, 1));
    let created = DateTimeRange::new(Some(utc(2019, 1, 1)), None).unwrap();
    let options = ReaderOptions::default().with_created(created);
    let mut reader = reader(Arc::new(api), Arc::new(MemorySink::new()), &options);

    let err = reader.read().await.unwrap_err();
    assert!(matches!(err, Error::Authorization { .. }));
    assert_eq!(reader.state(), ReaderState::Failed);
    assert!(matches!(reader.run().await, Err(Error::InvalidState { .. })));
}

#[tokio::test]
async fn test_cancelled_initialize() {
    let api = Arc::new(MockTable::with_rows(5));
    let mut reader = reader(api, Arc::new(MemorySink::new()), &ReaderOptions::default());
    reader.context().cancel();

    let err = reader.initialize().await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(reader.state(), ReaderState::Failed);
}

// ============================================================================
// Partition Reader Tests
// ============================================================================

#[tokio::test]
async fn test_partition_reader_narrows_query() {
    let dates = [utc(2019, 11, 20), utc(2019, 12, 5), utc(2019, 12, 31)];
    let api = Arc::new(MockTable::with_dates(&dates));
    let sink = Arc::new(MemorySink::new());
    let options = ReaderOptions::default().with_filter("active=true");
    let parent = reader(Arc::clone(&api), Arc::clone(&sink), &options);

    let partition = DatePartition::new(Interval::Month, utc(2019, 12, 1)).unwrap();
    let mut child = parent.for_partition(&partition);

    assert_eq!(child.name(), "M2019-12");
    assert_eq!(child.context().partition(), Some("M2019-12"));
    assert_eq!(child.query().filter(), Some("active=true"));
    assert_eq!(*child.query().created(), partition.range());
    assert!(!Arc::ptr_eq(child.metrics(), parent.metrics()));

    let summary = child.read().await.unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(parent.state(), ReaderState::Created);

    let deliveries = sink.deliveries().await;
    assert!(deliveries
        .iter()
        .all(|d| d.partition.as_deref() == Some("M2019-12")));
}

#[tokio::test]
async fn test_cancelling_parent_cancels_partition_reader() {
    let api = Arc::new(MockTable::with_rows(5));
    let parent = reader(api, Arc::new(MemorySink::new()), &ReaderOptions::default());
    let partition = DatePartition::new(Interval::Year, utc(2019, 1, 1)).unwrap();
    let child = parent.for_partition(&partition);

    parent.context().cancel();
    assert!(child.context().is_cancelled());
}
