//! Rate-limited `TableApi` decorator

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::api::{KeySource, PageRequest, ReadContext, TableApi};
use crate::error::{Error, Result};
use crate::query::EncodedQuery;
use crate::types::{KeySet, RecordBatch, TableStats};
use async_trait::async_trait;
use std::sync::Arc;

/// Wraps a `TableApi` so every call first waits for a rate limit permit.
///
/// The limiter is shared across clones and therefore across partitions.
#[derive(Clone)]
pub struct ThrottledApi {
    inner: Arc<dyn TableApi>,
    limiter: RateLimiter,
}

impl ThrottledApi {
    /// Throttle `inner` with `config`
    pub fn new(inner: Arc<dyn TableApi>, config: &RateLimiterConfig) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(config),
        }
    }

    async fn permit(&self, ctx: &ReadContext) -> Result<()> {
        tokio::select! {
            biased;
            () = ctx.cancelled() => Err(Error::Cancelled),
            () = self.limiter.wait() => Ok(()),
        }
    }
}

impl std::fmt::Debug for ThrottledApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledApi")
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TableApi for ThrottledApi {
    fn key_listing_cap(&self) -> Option<usize> {
        self.inner.key_listing_cap()
    }

    async fn fetch_keys(
        &self,
        ctx: &ReadContext,
        query: &EncodedQuery,
        source: KeySource,
    ) -> Result<KeySet> {
        self.permit(ctx).await?;
        self.inner.fetch_keys(ctx, query, source).await
    }

    async fn fetch_records(
        &self,
        ctx: &ReadContext,
        request: &PageRequest,
    ) -> Result<RecordBatch> {
        self.permit(ctx).await?;
        self.inner.fetch_records(ctx, request).await
    }

    async fn fetch_stats(
        &self,
        ctx: &ReadContext,
        query: &EncodedQuery,
        include_dates: bool,
    ) -> Result<TableStats> {
        self.permit(ctx).await?;
        self.inner.fetch_stats(ctx, query, include_dates).await
    }
}
