//! Error types for rowharvest
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Nothing in the read path is retried: every variant except
//! [`Error::Cancelled`] is fatal to the operation that raised it.

use thiserror::Error;

/// The main error type for rowharvest
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Remote Source Errors
    // ============================================================================
    #[error("Authorization failed: {message}")]
    Authorization { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    // ============================================================================
    // Read Errors
    // ============================================================================
    #[error("Incomplete key set for '{table}': expected {expected} keys, got {actual}")]
    Completeness {
        table: String,
        expected: u64,
        actual: u64,
    },

    #[error("Reader '{reader}' used before initialization")]
    NotInitialized { reader: String },

    #[error("Invalid reader state: {message}")]
    InvalidState { message: String },

    #[error("Date out of range: {message}")]
    DateOutOfRange { message: String },

    #[error("Read cancelled")]
    Cancelled,

    #[error("Partition '{partition}' failed after {processed} of {expected} rows: {source}")]
    Partition {
        partition: String,
        processed: u64,
        expected: u64,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a data completeness error
    pub fn completeness(table: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::Completeness {
            table: table.into(),
            expected,
            actual,
        }
    }

    /// Create a not-initialized error
    pub fn not_initialized(reader: impl Into<String>) -> Self {
        Self::NotInitialized {
            reader: reader.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a date out of range error
    pub fn date_out_of_range(message: impl Into<String>) -> Self {
        Self::DateOutOfRange {
            message: message.into(),
        }
    }

    /// Wrap an error with the partition it happened in
    pub fn partition(
        partition: impl Into<String>,
        processed: u64,
        expected: u64,
        source: Error,
    ) -> Self {
        Self::Partition {
            partition: partition.into(),
            processed,
            expected,
            source: Box::new(source),
        }
    }

    /// Check if this error was caused by cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Partition { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if this error is fatal to the operation that raised it
    pub fn is_fatal(&self) -> bool {
        !self.is_cancelled()
    }
}

/// Result type alias for rowharvest
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
