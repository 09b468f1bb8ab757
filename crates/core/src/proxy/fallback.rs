//! Fallback chain for failed upstream calls.
//!
//! Precedence, first match wins:
//!
//! 1. Disk record of any age      → `disk-stale`, stale, rehydrates memory
//! 2. Fixture                     → `fixture`, not stale, copied to both tiers
//! 3. Memory entry of any age     → `memory`, stale
//! 4. Nothing                     → the upstream failure as an error response
//!
//! Copies of fixture data found in steps 1 and 3 are answered as `fixture`
//! again. A record that turns out to be fresh (written by a concurrent
//! request after this one missed) is answered as a normal hit.

use chrono::{DateTime, Utc};
use log::{info, warn};
use tickerproxy_market_data::{CacheKey, FailureClass, UpstreamError};

use super::envelope::{DataSource, ProxyResponse};
use crate::cache::{CacheEntry, CacheSource, CacheTiers, TtlPolicy};
use crate::errors::ProxyError;

/// Walks the fallback chain. Reads every tier; writes only to rehydrate
/// faster tiers after a successful fallback read.
#[derive(Debug, Clone)]
pub struct FallbackOrchestrator {
    tiers: CacheTiers,
    ttl: TtlPolicy,
}

impl FallbackOrchestrator {
    pub fn new(tiers: CacheTiers, ttl: TtlPolicy) -> Self {
        Self { tiers, ttl }
    }

    /// Produce the best degraded response for `key` after `failure`.
    ///
    /// `stale_disk` is the disk record seen earlier in the same request, if
    /// any. When absent the disk is read again, since a concurrent request
    /// may have written it in the meantime.
    pub async fn recover(
        &self,
        key: &CacheKey,
        failure: UpstreamError,
        stale_disk: Option<CacheEntry>,
    ) -> ProxyResponse {
        let class = failure.failure_class();
        let error = ProxyError::Upstream(failure);
        let retry_after = error.retry_after();
        let ttl = self.ttl.ttl(key.operation);

        let disk_entry = match stale_disk {
            Some(entry) => Some(entry),
            None => self.tiers.disk.read(key).await,
        };
        if let Some(entry) = disk_entry {
            if entry.is_fresh(Utc::now(), ttl) {
                info!("Disk record for {} was refreshed concurrently", key);
                self.tiers
                    .memory
                    .set(key, entry.payload.clone(), entry.saved_at);
                return ProxyResponse::fresh(entry.payload, DataSource::Disk, ttl);
            }
            info!("Serving stale disk copy of {} ({})", key, class.reason());
            if entry.source == CacheSource::Fixture {
                self.tiers.memory.set_fixture(key, entry.payload.clone());
            } else {
                self.tiers
                    .memory
                    .set(key, entry.payload.clone(), entry.saved_at);
            }
            return degraded(entry, DataSource::DiskStale, class, retry_after);
        }

        if let Some(fixture) = self.tiers.fixtures.read(key).await {
            info!("Serving fixture for {} ({})", key, class.reason());
            self.tiers.memory.set_fixture(key, fixture.payload.clone());
            self.tiers.disk.write_fixture(key, &fixture.payload).await;
            return ProxyResponse::degraded(
                fixture.payload,
                DataSource::Fixture,
                false,
                warning(class, retry_after, None),
                retry_after,
            );
        }

        if let Some(entry) = self.tiers.memory.get(key) {
            if entry.is_fresh(Utc::now(), ttl) {
                info!("Memory entry for {} was refreshed concurrently", key);
                return ProxyResponse::fresh(entry.payload, DataSource::Memory, ttl);
            }
            info!("Serving expired memory copy of {} ({})", key, class.reason());
            return degraded(entry, DataSource::Memory, class, retry_after);
        }

        warn!("No fallback available for {}: {}", key, error);
        ProxyResponse::error(&error)
    }
}

/// Degraded answer from a cached entry. Fixture copies keep their identity.
fn degraded(
    entry: CacheEntry,
    source: DataSource,
    class: FailureClass,
    retry_after: Option<u64>,
) -> ProxyResponse {
    if entry.source == CacheSource::Fixture {
        return ProxyResponse::degraded(
            entry.payload,
            DataSource::Fixture,
            false,
            warning(class, retry_after, None),
            retry_after,
        );
    }
    ProxyResponse::degraded(
        entry.payload,
        source,
        true,
        warning(class, retry_after, Some(entry.saved_at)),
        retry_after,
    )
}

/// Human-readable explanation of why live data was not used.
fn warning(
    class: FailureClass,
    retry_after: Option<u64>,
    saved_at: Option<DateTime<Utc>>,
) -> String {
    let mut text = match saved_at {
        Some(saved_at) => format!(
            "{}; showing cached data saved at {}",
            capitalize(class.reason()),
            saved_at.to_rfc3339()
        ),
        None => format!("{}; showing sample data", capitalize(class.reason())),
    };
    if let Some(secs) = retry_after {
        text.push_str(&format!(". Retry after {}s", secs));
    }
    text
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DiskCache, FixtureStore, MemoryCache};
    use crate::proxy::envelope::CacheDirective;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};
    use tickerproxy_market_data::{Operation, Symbol};

    fn orchestrator() -> (FallbackOrchestrator, TempDir) {
        let dir = tempdir().unwrap();
        let tiers = CacheTiers::new(
            MemoryCache::new(),
            DiskCache::new(dir.path().join("cache")),
            FixtureStore::new(dir.path().join("fixtures")),
        );
        (FallbackOrchestrator::new(tiers, TtlPolicy::default()), dir)
    }

    fn key() -> CacheKey {
        CacheKey::new(Operation::Overview, Symbol::parse("IBM").unwrap())
    }

    fn timeout() -> UpstreamError {
        UpstreamError::Timeout {
            provider: "TEST".to_string(),
        }
    }

    #[tokio::test]
    async fn test_concurrently_written_disk_record_is_a_fresh_hit() {
        let (fallback, _dir) = orchestrator();
        fallback.tiers.disk.write(&key(), &json!({"Symbol": "IBM"})).await;

        let response = fallback.recover(&key(), timeout(), None).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.envelope.source(), Some(DataSource::Disk));
        assert!(!response.envelope.is_stale());
        assert!(response.envelope.warning().is_none());
        assert!(matches!(response.cache, CacheDirective::Public { .. }));
        assert!(fallback.tiers.memory.get(&key()).is_some());
    }

    #[tokio::test]
    async fn test_concurrently_written_memory_entry_is_a_fresh_hit() {
        let (fallback, _dir) = orchestrator();
        fallback
            .tiers
            .memory
            .set(&key(), json!({"Symbol": "IBM"}), Utc::now());

        let response = fallback.recover(&key(), timeout(), None).await;

        assert_eq!(response.envelope.source(), Some(DataSource::Memory));
        assert!(!response.envelope.is_stale());
    }

    #[tokio::test]
    async fn test_stale_disk_record_is_degraded() {
        let (fallback, _dir) = orchestrator();
        let saved_at = Utc::now() - ChronoDuration::days(3);
        fallback
            .tiers
            .disk
            .write_at(&key(), &json!({"Symbol": "IBM"}), saved_at)
            .await;

        let response = fallback.recover(&key(), timeout(), None).await;

        assert_eq!(response.envelope.source(), Some(DataSource::DiskStale));
        assert!(response.envelope.is_stale());
        assert_eq!(response.cache, CacheDirective::NoStore);
    }

    #[tokio::test]
    async fn test_fixture_copy_on_disk_is_answered_as_fixture() {
        let (fallback, _dir) = orchestrator();
        fallback
            .tiers
            .disk
            .write_fixture(&key(), &json!({"Symbol": "IBM"}))
            .await;

        let response = fallback.recover(&key(), timeout(), None).await;

        assert_eq!(response.envelope.source(), Some(DataSource::Fixture));
        assert!(!response.envelope.is_stale());
        assert!(response.envelope.warning().unwrap().contains("sample data"));
        assert_eq!(
            fallback.tiers.memory.get(&key()).unwrap().source,
            CacheSource::Fixture
        );
    }

    #[test]
    fn test_warning_mentions_reason_and_retry() {
        let text = warning(FailureClass::Throttled, Some(1), None);
        assert_eq!(
            text,
            "Upstream rate limit reached; showing sample data. Retry after 1s"
        );
    }

    #[test]
    fn test_warning_mentions_saved_at() {
        let saved_at = Utc::now();
        let text = warning(FailureClass::Timeout, None, Some(saved_at));
        assert!(text.starts_with("Upstream request timed out; showing cached data saved at "));
        assert!(text.contains(&saved_at.to_rfc3339()));
        assert!(!text.contains("Retry after"));
    }
}
