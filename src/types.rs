//! Common types used throughout rowharvest
//!
//! This module contains the shared data model: row keys, key sets,
//! date ranges and record batches.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A single extracted row
pub type Record = JsonObject;

// ============================================================================
// Keys
// ============================================================================

static GUID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[0-9a-f]{32}$").expect("GUID pattern is valid"));

/// Opaque unique row identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Wrap any value as a key without validation
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a 32-character lowercase hex GUID
    pub fn parse(value: &str) -> Result<Self> {
        if GUID_PATTERN.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::malformed(format!("Invalid key: {value:?}")))
        }
    }

    /// Borrow the key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this key has the GUID format
    pub fn is_guid(&self) -> bool {
        GUID_PATTERN.is_match(&self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Immutable, insertion-ordered set of unique keys.
///
/// Slices share the underlying storage, so `slice` and `chunks` are O(1)
/// per produced view and never mutate the source.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: Arc<Vec<Key>>,
    start: usize,
    end: usize,
}

impl KeySet {
    /// Create an empty key set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a key set, keeping the first occurrence of each key
    pub fn from_keys(keys: impl IntoIterator<Item = Key>) -> Self {
        let mut seen = HashSet::new();
        let keys: Vec<Key> = keys
            .into_iter()
            .filter(|k| seen.insert(k.clone()))
            .collect();
        let end = keys.len();
        Self {
            keys: Arc::new(keys),
            start: 0,
            end,
        }
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if there are no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys as a slice
    pub fn as_slice(&self) -> &[Key] {
        &self.keys[self.start..self.end]
    }

    /// Iterate over keys in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.as_slice().iter()
    }

    /// Contiguous view of `[from, to)`; bounds are clamped to the set
    pub fn slice(&self, from: usize, to: usize) -> KeySet {
        let to = to.min(self.len());
        let from = from.min(to);
        Self {
            keys: Arc::clone(&self.keys),
            start: self.start + from,
            end: self.start + to,
        }
    }

    /// Split into contiguous chunks of `size` keys (the last may be shorter)
    pub fn chunks(&self, size: usize) -> KeyChunks {
        KeyChunks {
            set: self.clone(),
            size: size.max(1),
            pos: 0,
        }
    }
}

impl PartialEq for KeySet {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for KeySet {}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet").field("len", &self.len()).finish()
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self::from_keys(iter)
    }
}

/// Iterator over contiguous key set chunks
#[derive(Debug, Clone)]
pub struct KeyChunks {
    set: KeySet,
    size: usize,
    pos: usize,
}

impl Iterator for KeyChunks {
    type Item = KeySet;

    fn next(&mut self) -> Option<KeySet> {
        if self.pos >= self.set.len() {
            return None;
        }
        let chunk = self.set.slice(self.pos, self.pos + self.size);
        self.pos += chunk.len();
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.set.len() - self.pos).div_ceil(self.size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for KeyChunks {}

// ============================================================================
// Date Ranges
// ============================================================================

/// Half-open `[start, end)` range; a missing bound is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateTimeRange {
    /// Inclusive lower bound
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub end: Option<DateTime<Utc>>,
}

impl DateTimeRange {
    /// Create a range, rejecting `end < start`
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(Error::config(format!(
                    "Range end {e} is before start {s}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Range with both bounds present
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Self::new(Some(start), Some(end))
    }

    /// Range with no bounds
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Check if both bounds are present
    pub fn is_bounded(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Check if neither bound is present
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Check if the range is bounded and contains no instant
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if e <= s)
    }

    /// Check if an instant falls within the range
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }

    /// Intersection: the tighter bound on each side.
    ///
    /// Disjoint ranges collapse to an empty range at the later start.
    #[must_use]
    pub fn intersect(&self, other: &DateTimeRange) -> DateTimeRange {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let mut end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                end = Some(s);
            }
        }
        DateTimeRange { start, end }
    }
}

impl fmt::Display for DateTimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |d: Option<DateTime<Utc>>| {
            d.map_or_else(|| "*".to_string(), |d| d.format(DATETIME_FORMAT).to_string())
        };
        write!(f, "[{}, {})", show(self.start), show(self.end))
    }
}

/// Timestamp format used in encoded queries and partition names
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a datetime string into UTC DateTime
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    // Try RFC 3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S", DATETIME_FORMAT];
    for fmt in formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            let ndt = nd
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| Error::config(format!("Invalid date: {s}")))?;
            return Ok(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    Err(Error::config(format!("Invalid datetime format: {s}")))
}

// ============================================================================
// Records
// ============================================================================

/// One page of records, delivered to the sink as a unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    records: Vec<Record>,
}

impl RecordBatch {
    /// Create a batch from records
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrow the records
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Take ownership of the records
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Extract the string values of `field`, skipping records without it
    pub fn keys(&self, field: &str) -> Vec<Key> {
        self.records
            .iter()
            .filter_map(|r| r.get(field).and_then(JsonValue::as_str))
            .map(Key::new)
            .collect()
    }
}

impl From<Vec<Record>> for RecordBatch {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

// ============================================================================
// Display Value Mode
// ============================================================================

/// Whether reference fields are read as raw values, resolved labels, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "DisplayValueRepr")]
pub enum DisplayValue {
    /// Raw stored values
    #[default]
    #[serde(rename = "false")]
    Raw,
    /// Resolved display labels
    #[serde(rename = "true")]
    Display,
    /// Both raw values and labels
    #[serde(rename = "all")]
    All,
}

/// Accepts YAML booleans as well as the `false`/`true`/`all` names
#[derive(Deserialize)]
#[serde(untagged)]
enum DisplayValueRepr {
    Flag(bool),
    Name(String),
}

impl TryFrom<DisplayValueRepr> for DisplayValue {
    type Error = String;

    fn try_from(repr: DisplayValueRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            DisplayValueRepr::Flag(false) => Ok(Self::Raw),
            DisplayValueRepr::Flag(true) => Ok(Self::Display),
            DisplayValueRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "false" | "raw" => Ok(Self::Raw),
                "true" | "display" => Ok(Self::Display),
                "all" => Ok(Self::All),
                other => Err(format!("unknown display value mode: {other}")),
            },
        }
    }
}

impl DisplayValue {
    /// Value as sent to the remote source
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Raw => "false",
            Self::Display => "true",
            Self::All => "all",
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Authoritative statistics for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableStats {
    /// Number of matching rows
    pub count: u64,
    /// Earliest creation timestamp, when requested
    pub min_created: Option<DateTime<Utc>>,
    /// Latest creation timestamp, when requested
    pub max_created: Option<DateTime<Utc>>,
}

impl TableStats {
    /// Stats with a row count only
    pub fn count(count: u64) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Stats with a row count and creation date bounds
    pub fn with_created(count: u64, min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        Self {
            count,
            min_created: Some(min),
            max_created: Some(max),
        }
    }

    /// Half-open range covering every creation timestamp.
    ///
    /// The end is one second past the latest timestamp, since the remote
    /// source stores whole seconds.
    pub fn created_range(&self) -> DateTimeRange {
        DateTimeRange {
            start: self.min_created,
            end: self
                .max_created
                .and_then(|max| max.checked_add_signed(chrono::Duration::seconds(1))),
        }
    }
}
