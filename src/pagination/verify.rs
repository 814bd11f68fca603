//! Key list completeness verification
//!
//! The primary key-listing call of some protocols truncates silently at a
//! fixed cap. A list that reaches the cap is checked against the
//! statistics count, and a mismatch triggers exactly one re-fetch through
//! the alternate protocol. If that list is also short the read fails:
//! continuing would silently drop rows from every downstream extraction.

use crate::api::{KeySource, ReadContext, TableApi};
use crate::error::{Error, Result};
use crate::query::EncodedQuery;
use crate::types::KeySet;
use tracing::{debug, warn};

/// A key list that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedKeys {
    /// The complete key list
    pub keys: KeySet,
    /// Statistics count, when one was consulted
    pub authoritative: Option<u64>,
    /// Whether the alternate protocol supplied the list
    pub fallback_used: bool,
}

/// Fetches a key list and proves it complete
pub struct CompletenessVerifier<'a> {
    api: &'a dyn TableApi,
    ctx: &'a ReadContext,
}

impl<'a> CompletenessVerifier<'a> {
    /// Create a verifier over `api`
    pub fn new(api: &'a dyn TableApi, ctx: &'a ReadContext) -> Self {
        Self { api, ctx }
    }

    /// Lists below this size cannot have been truncated
    fn threshold(&self) -> Option<usize> {
        self.api.key_listing_cap().map(|cap| cap.saturating_sub(1))
    }

    /// Fetch every key matching `query`
    pub async fn fetch_keys(&self, query: &EncodedQuery) -> Result<VerifiedKeys> {
        let keys = self.list(query, KeySource::Primary).await?;

        let Some(threshold) = self.threshold() else {
            return Ok(accepted(keys, None, false));
        };
        if keys.len() < threshold {
            return Ok(accepted(keys, None, false));
        }

        let count = self
            .ctx
            .until_cancelled(self.api.fetch_stats(self.ctx, query, false))
            .await?
            .count;
        if keys.len() as u64 == count {
            debug!(
                "{}: {} keys at the listing cap match the row count",
                self.ctx.label(),
                count
            );
            return Ok(accepted(keys, Some(count), false));
        }

        warn!(
            "{}: key listing returned {} keys but the row count is {}; re-fetching with the alternate protocol",
            self.ctx.label(),
            keys.len(),
            count
        );
        let keys = self.list(query, KeySource::Alternate).await?;
        if keys.len() as u64 != count {
            return Err(Error::completeness(
                self.ctx.table(),
                count,
                keys.len() as u64,
            ));
        }
        Ok(accepted(keys, Some(count), true))
    }

    async fn list(&self, query: &EncodedQuery, source: KeySource) -> Result<KeySet> {
        self.ctx
            .until_cancelled(self.api.fetch_keys(self.ctx, query, source))
            .await
    }
}

fn accepted(keys: KeySet, authoritative: Option<u64>, fallback_used: bool) -> VerifiedKeys {
    VerifiedKeys {
        keys,
        authoritative,
        fallback_used,
    }
}
