//! In-memory `TableApi` used by unit tests

use crate::api::{KeySource, PageRequest, PageWindow, ReadContext, TableApi};
use crate::error::{Error, Result};
use crate::query::EncodedQuery;
use crate::types::{Key, KeySet, Record, RecordBatch, TableStats, DATETIME_FORMAT};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct MockRow {
    pub key: Key,
    pub created: DateTime<Utc>,
    pub hidden: bool,
}

/// Table of rows sorted by key, with optional access-control hiding,
/// a primary key-listing cap and call counters.
#[derive(Debug, Default)]
pub(crate) struct MockTable {
    rows: Vec<MockRow>,
    pub key_cap: Option<usize>,
    pub alternate_limit: Option<usize>,
    pub count_override: Option<u64>,
    pub fail_partition_start: Option<DateTime<Utc>>,
    pub primary_key_calls: AtomicUsize,
    pub alternate_key_calls: AtomicUsize,
    pub stats_calls: AtomicUsize,
    pub windows: Mutex<Vec<PageWindow>>,
}

pub(crate) fn key(i: usize) -> Key {
    Key::new(format!("{i:032x}"))
}

pub(crate) fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

impl MockTable {
    /// `n` rows, one hour apart starting at 2019-01-01
    pub fn with_rows(n: usize) -> Self {
        let base = utc(2019, 1, 1);
        Self::from_rows(
            (0..n)
                .map(|i| MockRow {
                    key: key(i),
                    created: base + Duration::hours(i as i64),
                    hidden: false,
                })
                .collect(),
        )
    }

    /// Rows created at the given instants
    pub fn with_dates(dates: &[DateTime<Utc>]) -> Self {
        Self::from_rows(
            dates
                .iter()
                .enumerate()
                .map(|(i, &created)| MockRow {
                    key: key(i),
                    created,
                    hidden: false,
                })
                .collect(),
        )
    }

    pub fn from_rows(mut rows: Vec<MockRow>) -> Self {
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Hide the given row indices from the caller
    pub fn hide(mut self, indices: &[usize]) -> Self {
        let hidden: HashSet<Key> = indices.iter().map(|&i| key(i)).collect();
        for row in &mut self.rows {
            row.hidden = hidden.contains(&row.key);
        }
        self
    }

    pub fn record_requests(&self) -> usize {
        self.windows.lock().unwrap().len()
    }

    fn matches(row: &MockRow, query: &EncodedQuery) -> bool {
        query.created().contains(row.created)
            && query
                .keys()
                .map_or(true, |keys| keys.iter().any(|k| *k == row.key))
    }

    fn visible<'a>(&'a self, query: &'a EncodedQuery) -> impl Iterator<Item = &'a MockRow> {
        self.rows
            .iter()
            .filter(move |r| !r.hidden && Self::matches(r, query))
    }

    fn to_record(row: &MockRow) -> Record {
        json!({
            "sys_id": row.key.as_str(),
            "sys_created_on": row.created.format(DATETIME_FORMAT).to_string(),
        })
        .as_object()
        .cloned()
        .unwrap_or_default()
    }
}

#[async_trait]
impl TableApi for MockTable {
    fn key_listing_cap(&self) -> Option<usize> {
        self.key_cap
    }

    async fn fetch_keys(
        &self,
        _ctx: &ReadContext,
        query: &EncodedQuery,
        source: KeySource,
    ) -> Result<KeySet> {
        let limit = match source {
            KeySource::Primary => {
                self.primary_key_calls.fetch_add(1, Ordering::SeqCst);
                self.key_cap
            }
            KeySource::Alternate => {
                self.alternate_key_calls.fetch_add(1, Ordering::SeqCst);
                self.alternate_limit
            }
        };
        Ok(self
            .visible(query)
            .take(limit.unwrap_or(usize::MAX))
            .map(|r| r.key.clone())
            .collect())
    }

    async fn fetch_records(&self, _ctx: &ReadContext, request: &PageRequest) -> Result<RecordBatch> {
        self.windows.lock().unwrap().push(request.window);
        if let Some(start) = self.fail_partition_start {
            if request.query.created().start == Some(start) {
                return Err(Error::authorization("read denied"));
            }
        }
        let query = &request.query;
        let rows: Vec<Record> = match request.window {
            PageWindow::Offset { offset, limit } => self
                .visible(query)
                .skip(offset as usize)
                .take(limit as usize)
                .map(Self::to_record)
                .collect(),
            // Row numbers count hidden rows; they are filtered after windowing
            PageWindow::Rows { first, last } => self
                .rows
                .iter()
                .filter(|r| Self::matches(r, query))
                .skip(first as usize)
                .take((last - first) as usize)
                .filter(|r| !r.hidden)
                .map(Self::to_record)
                .collect(),
            PageWindow::All => self.visible(query).map(Self::to_record).collect(),
        };
        Ok(RecordBatch::new(rows))
    }

    async fn fetch_stats(
        &self,
        _ctx: &ReadContext,
        query: &EncodedQuery,
        include_dates: bool,
    ) -> Result<TableStats> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        let rows: Vec<&MockRow> = self.visible(query).collect();
        let count = self.count_override.unwrap_or(rows.len() as u64);
        let mut stats = TableStats::count(count);
        if include_dates {
            stats.min_created = rows.iter().map(|r| r.created).min();
            stats.max_created = rows.iter().map(|r| r.created).max();
        }
        Ok(stats)
    }
}
