//! Extraction configuration
//!
//! YAML description of one table read. Loading parses then validates, so a
//! config returned by [`load_config`] can always be turned into
//! [`ReaderOptions`].
//!
//! ```yaml
//! table: incident
//! pagination: key_slice
//! page_size: 200
//! threads: 4
//! filter: active=true
//! created:
//!   start: 2019-01-01
//!   end: 2020-01-01
//! partition: month
//! display_value: all
//! fields: [number, short_description]
//! rate_limit:
//!   requests_per_second: 5
//!   burst_size: 10
//! ```

use crate::api::ReadContext;
use crate::error::{Error, Result, ResultExt};
use crate::interval::Interval;
use crate::pagination::Pagination;
use crate::reader::ReaderOptions;
use crate::throttle::RateLimiterConfig;
use crate::types::{parse_datetime, DateTimeRange, DisplayValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// One table extraction, as loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Remote table name
    pub table: String,

    /// Pagination strategy
    #[serde(default)]
    pub pagination: Pagination,

    /// Rows per page; defaults per strategy
    #[serde(default)]
    pub page_size: Option<usize>,

    /// Worker count; 0 or 1 reads partitions sequentially
    #[serde(default)]
    pub threads: usize,

    /// Base filter predicate
    #[serde(default)]
    pub filter: Option<String>,

    /// Created-on bounds
    #[serde(default)]
    pub created: RangeDefinition,

    /// Updated-on bounds
    #[serde(default)]
    pub updated: RangeDefinition,

    /// Partition granularity
    #[serde(default)]
    pub partition: Option<Interval>,

    /// Raw values, display labels, or both
    #[serde(default)]
    pub display_value: DisplayValue,

    /// Field projection; empty means every field
    #[serde(default)]
    pub fields: Vec<String>,

    /// Named view to read through
    #[serde(default)]
    pub view: Option<String>,

    /// Seconds between progress log lines during a parallel read
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Request rate limit
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

fn default_poll_interval_secs() -> u64 {
    30
}

/// Date bounds as written in YAML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeDefinition {
    /// Inclusive start
    #[serde(default)]
    pub start: Option<String>,
    /// Exclusive end
    #[serde(default)]
    pub end: Option<String>,
}

impl RangeDefinition {
    /// Parse both bounds
    pub fn to_range(&self) -> Result<DateTimeRange> {
        let parse = |s: &Option<String>| -> Result<_> {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_datetime)
                .transpose()
        };
        DateTimeRange::new(parse(&self.start)?, parse(&self.end)?)
    }
}

impl ExtractConfig {
    /// Minimal config for `table` with every default
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            pagination: Pagination::default(),
            page_size: None,
            threads: 0,
            filter: None,
            created: RangeDefinition::default(),
            updated: RangeDefinition::default(),
            partition: None,
            display_value: DisplayValue::default(),
            fields: Vec::new(),
            view: None,
            poll_interval_secs: default_poll_interval_secs(),
            rate_limit: None,
        }
    }

    /// Effective page size
    pub fn page_size(&self) -> usize {
        self.page_size
            .unwrap_or_else(|| self.pagination.default_page_size())
    }

    /// Convert to the runtime options used by readers
    pub fn reader_options(&self) -> Result<ReaderOptions> {
        let created = self.created.to_range().map_err(|e| range_error("created", e))?;
        let updated = self.updated.to_range().map_err(|e| range_error("updated", e))?;

        let mut options = ReaderOptions::new(self.pagination)
            .with_page_size(self.page_size())
            .with_threads(self.threads)
            .with_created(created)
            .with_updated(updated)
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs));
        if let Some(filter) = self.filter.as_deref().filter(|f| !f.trim().is_empty()) {
            options = options.with_filter(filter);
        }
        if let Some(interval) = self.partition {
            options = options.with_partition(interval);
        }
        Ok(options)
    }

    /// Root request context for this read
    pub fn read_context(&self) -> ReadContext {
        let ctx = ReadContext::new(self.table.trim())
            .with_display_value(self.display_value)
            .with_fields(self.fields.clone());
        match &self.view {
            Some(view) => ctx.with_view(view.as_str()),
            None => ctx,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::missing_field("table"));
        }
        if self.page_size == Some(0) {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::invalid_value("poll_interval_secs", "must be positive"));
        }
        if let Some(limit) = &self.rate_limit {
            if limit.requests_per_second == 0 {
                return Err(Error::invalid_value(
                    "rate_limit.requests_per_second",
                    "must be positive",
                ));
            }
        }
        self.reader_options()?.validate()
    }
}

fn range_error(field: &str, e: Error) -> Error {
    match e {
        Error::Config { message } => Error::invalid_value(field, message),
        other => other,
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a config file
pub fn load_config(path: impl AsRef<Path>) -> Result<ExtractConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    load_config_from_str(&content)
}

/// Load and validate a config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<ExtractConfig> {
    let config: ExtractConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}
