//! Proxy service: the per-request state machine.
//!
//! ```text
//! ValidateInput ─▶ CheckMemory ─▶ CheckDisk ─▶ CallUpstream ─┬─▶ Success  ─▶ Respond
//!      │               │ fresh        │ fresh                └─▶ Fallback ─▶ Respond
//!      ▼               ▼              ▼
//!     400           memory          disk (rehydrates memory)
//! ```
//!
//! Nothing is persisted between requests except through the cache tiers, and
//! a request makes at most one upstream call.
//!
//! An optional deadline bounds the time spent in the upstream lane (queueing
//! plus the call). When it passes, the request continues down the fallback
//! chain as an upstream timeout, so the caller still gets an envelope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use tickerproxy_market_data::{
    validate_request, CacheKey, UpstreamError, UpstreamProvider, UpstreamScheduler,
};

use super::envelope::{DataSource, ProxyResponse};
use super::fallback::FallbackOrchestrator;
use crate::cache::{CacheTiers, TtlPolicy};
use crate::errors::ProxyError;

/// Entry point used by the HTTP layer.
#[async_trait]
pub trait ProxyServiceTrait: Send + Sync {
    /// Serve one proxy request from raw query values.
    async fn handle(&self, operation: Option<&str>, symbol: Option<&str>) -> ProxyResponse;
}

pub struct ProxyService {
    /// `None` when no upstream credential is configured.
    provider: Option<Arc<dyn UpstreamProvider>>,
    scheduler: Arc<UpstreamScheduler>,
    tiers: CacheTiers,
    ttl: TtlPolicy,
    fallback: FallbackOrchestrator,
    /// Upper bound on lane wait plus upstream call.
    deadline: Option<Duration>,
}

impl ProxyService {
    pub fn new(
        provider: Option<Arc<dyn UpstreamProvider>>,
        scheduler: Arc<UpstreamScheduler>,
        tiers: CacheTiers,
        ttl: TtlPolicy,
    ) -> Self {
        if provider.is_none() {
            warn!("No upstream credential configured; every proxy request will fail with 500");
        }
        let fallback = FallbackOrchestrator::new(tiers.clone(), ttl);
        Self {
            provider,
            scheduler,
            tiers,
            ttl,
            fallback,
            deadline: None,
        }
    }

    /// Bound the time a request may spend waiting for and making its
    /// upstream call.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn tiers(&self) -> &CacheTiers {
        &self.tiers
    }

    async fn serve(&self, provider: &dyn UpstreamProvider, key: CacheKey) -> ProxyResponse {
        let now = Utc::now();
        let ttl = self.ttl.ttl(key.operation);

        if let Some(entry) = self.tiers.memory.get(&key) {
            if entry.is_fresh(now, ttl) {
                debug!("Memory hit for {}", key);
                return ProxyResponse::fresh(entry.payload, DataSource::Memory, ttl);
            }
        }

        // A stale disk record is kept for this request only, as the first
        // fallback candidate.
        let stale_disk = match self.tiers.disk.read(&key).await {
            Some(entry) if entry.is_fresh(now, ttl) => {
                debug!("Disk hit for {}", key);
                self.tiers
                    .memory
                    .set(&key, entry.payload.clone(), entry.saved_at);
                return ProxyResponse::fresh(entry.payload, DataSource::Disk, ttl);
            }
            other => other,
        };

        let call = self.scheduler.run(provider.fetch(&key));
        let outcome = match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!("Upstream lane deadline of {:?} passed for {}", limit, key);
                    Err(UpstreamError::Timeout {
                        provider: provider.id().to_string(),
                    })
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(payload) => {
                info!("Fetched {} from {}", key, provider.id());
                let saved_at = Utc::now();
                self.tiers.memory.set(&key, payload.clone(), saved_at);
                self.tiers.disk.write_at(&key, &payload, saved_at).await;
                ProxyResponse::fresh(payload, DataSource::Upstream, ttl)
            }
            Err(failure) => {
                warn!("Upstream call for {} failed: {}", key, failure);
                self.fallback.recover(&key, failure, stale_disk).await
            }
        }
    }
}

#[async_trait]
impl ProxyServiceTrait for ProxyService {
    async fn handle(&self, operation: Option<&str>, symbol: Option<&str>) -> ProxyResponse {
        let Some(provider) = self.provider.as_deref() else {
            return ProxyResponse::error(&ProxyError::MissingCredential);
        };

        let key = match validate_request(operation, symbol) {
            Ok(key) => key,
            Err(e) => {
                debug!("Rejected proxy request: {}", e);
                return ProxyResponse::error(&ProxyError::Validation(e));
            }
        };

        self.serve(provider, key).await
    }
}
