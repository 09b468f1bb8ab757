//! Upstream provider trait definition.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::UpstreamError;
use crate::models::CacheKey;

/// A source of live market data behind the proxy.
///
/// Implementations perform exactly one network call per `fetch` and return
/// the upstream payload untouched on success. Pacing is not their concern;
/// callers route every `fetch` through the
/// [`UpstreamScheduler`](crate::scheduler::UpstreamScheduler).
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Unique identifier for this provider, e.g. "ALPHA_VANTAGE".
    /// Used in logs and error messages.
    fn id(&self) -> &'static str;

    /// Fetch the payload for `key`, classified into success or an
    /// [`UpstreamError`].
    async fn fetch(&self, key: &CacheKey) -> Result<Value, UpstreamError>;
}
