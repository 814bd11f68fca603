//! Request-scoped read context

use crate::error::{Error, Result};
use crate::types::DisplayValue;
use std::future::Future;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Context threaded through every remote call and sink delivery
#[derive(Debug, Clone)]
pub struct ReadContext {
    table: String,
    partition: Option<String>,
    display_value: DisplayValue,
    fields: Option<Vec<String>>,
    view: Option<String>,
    cancel: CancellationToken,
}

impl ReadContext {
    /// Create a context for `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            partition: None,
            display_value: DisplayValue::default(),
            fields: None,
            view: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set display value mode
    #[must_use]
    pub fn with_display_value(mut self, mode: DisplayValue) -> Self {
        self.display_value = mode;
        self
    }

    /// Restrict returned fields
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = (!fields.is_empty()).then_some(fields);
        self
    }

    /// Read through a named view
    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Use an existing cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Derive the context for one partition; cancelling the parent cancels it
    #[must_use]
    pub fn for_partition(&self, name: impl Into<String>) -> Self {
        Self {
            partition: Some(name.into()),
            cancel: self.cancel.child_token(),
            ..self.clone()
        }
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Partition name, if this is a partition read
    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    /// Display value mode
    pub fn display_value(&self) -> DisplayValue {
        self.display_value
    }

    /// Field projection
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    /// Named view
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// Name used in logs and errors: the partition name or the table
    pub fn label(&self) -> &str {
        self.partition.as_deref().unwrap_or(&self.table)
    }

    /// Cancel this read and every partition derived from it
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation is requested
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Await `call`, abandoning it with [`Error::Cancelled`] once the read is cancelled
    pub async fn until_cancelled<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            result = call => result,
        }
    }

    /// The underlying token
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
