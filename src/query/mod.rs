//! Encoded query module
//!
//! A serializable predicate combining a base filter, created/updated date
//! ranges, and an optional "key in this subset" clause.
//!
//! # Overview
//!
//! `EncodedQuery` is immutable: every refinement returns a new query, so a
//! partition or key-slice query can be derived from a parent without
//! touching it. Narrowing a date range always intersects with the range
//! already present, keeping the tighter bound on each side.

use crate::types::{DateTimeRange, KeySet, DATETIME_FORMAT};
use chrono::{DateTime, Utc};
use std::fmt;

/// Separator between encoded query terms
const TERM_SEPARATOR: char = '^';

/// Field names used when encoding a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFields {
    /// Creation timestamp field
    pub created: String,
    /// Last-updated timestamp field
    pub updated: String,
    /// Unique key field
    pub key: String,
}

impl Default for QueryFields {
    fn default() -> Self {
        Self {
            created: "sys_created_on".to_string(),
            updated: "sys_updated_on".to_string(),
            key: "sys_id".to_string(),
        }
    }
}

/// Query predicate sent to the remote source
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedQuery {
    filter: Option<String>,
    created: DateTimeRange,
    updated: DateTimeRange,
    keys: Option<KeySet>,
    order_by_key: bool,
}

impl EncodedQuery {
    /// A query matching every row
    pub fn new() -> Self {
        Self::default()
    }

    /// A query with a base filter; empty filters are treated as absent
    pub fn with_filter(filter: impl Into<String>) -> Self {
        let filter = filter.into();
        let filter = filter.trim();
        Self {
            filter: (!filter.is_empty()).then(|| filter.to_string()),
            ..Self::default()
        }
    }

    /// Narrow the created-on range
    #[must_use]
    pub fn created_within(mut self, range: &DateTimeRange) -> Self {
        self.created = self.created.intersect(range);
        self
    }

    /// Narrow the updated-on range
    #[must_use]
    pub fn updated_within(mut self, range: &DateTimeRange) -> Self {
        self.updated = self.updated.intersect(range);
        self
    }

    /// Restrict to a subset of keys
    #[must_use]
    pub fn with_keys(mut self, keys: KeySet) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Order results by key
    #[must_use]
    pub fn order_by_key(mut self) -> Self {
        self.order_by_key = true;
        self
    }

    /// Base filter
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Effective created-on range
    pub fn created(&self) -> &DateTimeRange {
        &self.created
    }

    /// Effective updated-on range
    pub fn updated(&self) -> &DateTimeRange {
        &self.updated
    }

    /// Key subset, if restricted
    pub fn keys(&self) -> Option<&KeySet> {
        self.keys.as_ref()
    }

    /// Whether results are ordered by key
    pub fn is_ordered_by_key(&self) -> bool {
        self.order_by_key
    }

    /// Render with the given field names
    pub fn encode_with(&self, fields: &QueryFields) -> String {
        let mut terms: Vec<String> = Vec::new();
        if let Some(filter) = &self.filter {
            terms.push(filter.clone());
        }
        push_range(&mut terms, &fields.created, &self.created);
        push_range(&mut terms, &fields.updated, &self.updated);
        if let Some(keys) = &self.keys {
            let list: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
            terms.push(format!("{}IN{}", fields.key, list.join(",")));
        }
        if self.order_by_key {
            terms.push(format!("ORDERBY{}", fields.key));
        }
        terms.join(&TERM_SEPARATOR.to_string())
    }

    /// Render with the default field names
    pub fn encode(&self) -> String {
        self.encode_with(&QueryFields::default())
    }
}

impl fmt::Display for EncodedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn push_range(terms: &mut Vec<String>, field: &str, range: &DateTimeRange) {
    if let Some(start) = range.start {
        terms.push(format!("{field}>={}", format_datetime(start)));
    }
    if let Some(end) = range.end {
        terms.push(format!("{field}<{}", format_datetime(end)));
    }
}

fn format_datetime(at: DateTime<Utc>) -> String {
    at.format(DATETIME_FORMAT).to_string()
}
