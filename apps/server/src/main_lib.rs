use std::sync::Arc;

use tickerproxy_core::{
    CacheTiers, DiskCache, FixtureStore, MemoryCache, ProxyService, ProxyServiceTrait,
};
use tickerproxy_market_data::{AlphaVantageProvider, UpstreamProvider, UpstreamScheduler};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, API_KEY_VAR};

pub struct AppState {
    pub proxy_service: Arc<dyn ProxyServiceTrait>,
    /// Whether an upstream credential was found at startup.
    pub credential_configured: bool,
}

pub fn init_tracing() {
    let log_format = std::env::var("TP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Share of the request timeout a `/proxy` request may spend in the
/// upstream lane, leaving room for the fallback chain.
const LANE_SHARE_NUM: u32 = 3;
const LANE_SHARE_DEN: u32 = 4;

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let tiers = CacheTiers::new(
        MemoryCache::new(),
        DiskCache::new(config.cache_dir.clone()),
        FixtureStore::new(config.fixtures_dir.clone()),
    );

    if let Err(e) = tokio::fs::create_dir_all(tiers.disk.dir()).await {
        // Disk writes are best-effort; the proxy still works from memory.
        tracing::warn!(
            "Could not create cache directory {}: {}",
            tiers.disk.dir().display(),
            e
        );
    }
    tiers.disk.sweep_temp_files().await;
    tracing::info!("Disk cache: {}", tiers.disk.dir().display());
    tracing::info!("Fixtures: {}", tiers.fixtures.dir().display());

    let provider: Option<Arc<dyn UpstreamProvider>> = match &config.api_key {
        Some(key) => Some(Arc::new(AlphaVantageProvider::with_endpoint(
            key.clone(),
            config.upstream_url.clone(),
            config.upstream_timeout,
        ))),
        None => {
            tracing::error!(
                "{} is not set; every /proxy request will answer 500",
                API_KEY_VAR
            );
            None
        }
    };
    let credential_configured = provider.is_some();

    let scheduler = Arc::new(UpstreamScheduler::with_spacing(config.min_spacing));
    let lane_deadline = config.request_timeout * LANE_SHARE_NUM / LANE_SHARE_DEN;
    tracing::info!(
        "Upstream lane: {} (min spacing {:?}, call timeout {:?}, lane deadline {:?})",
        config.upstream_url,
        scheduler.min_spacing(),
        config.upstream_timeout,
        lane_deadline
    );

    let proxy_service = Arc::new(
        ProxyService::new(provider, scheduler, tiers, config.ttl).with_deadline(lane_deadline),
    );

    Ok(Arc::new(AppState {
        proxy_service,
        credential_configured,
    }))
}
