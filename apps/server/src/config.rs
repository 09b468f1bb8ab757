use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use tickerproxy_core::constants::{DEFAULT_DAILY_TTL, DEFAULT_OVERVIEW_TTL};
use tickerproxy_core::TtlPolicy;
use tickerproxy_market_data::provider::alpha_vantage::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use tickerproxy_market_data::DEFAULT_MIN_SPACING;

/// Name of the environment variable holding the upstream credential.
pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";

pub struct Config {
    pub listen_addr: SocketAddr,
    /// `None` when the credential is absent; the server still starts.
    pub api_key: Option<String>,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub min_spacing: Duration,
    pub cache_dir: PathBuf,
    pub fixtures_dir: PathBuf,
    pub ttl: TtlPolicy,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let listen_addr: SocketAddr = lookup("TP_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid TP_LISTEN_ADDR")?;
        let api_key = lookup(API_KEY_VAR)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let upstream_url = lookup("TP_UPSTREAM_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let cache_dir = lookup("TP_CACHE_DIR").unwrap_or_else(|| "./data/cache".into());
        let fixtures_dir = lookup("TP_FIXTURES_DIR").unwrap_or_else(|| "./fixtures".into());
        let cors_allow = lookup("TP_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let millis = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        let secs = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Ok(Self {
            listen_addr,
            api_key,
            upstream_url,
            upstream_timeout: millis("TP_UPSTREAM_TIMEOUT_MS", DEFAULT_TIMEOUT),
            min_spacing: millis("TP_MIN_SPACING_MS", DEFAULT_MIN_SPACING),
            cache_dir: PathBuf::from(cache_dir),
            fixtures_dir: PathBuf::from(fixtures_dir),
            ttl: TtlPolicy {
                overview: secs("TP_TTL_OVERVIEW_SECS", DEFAULT_OVERVIEW_TTL),
                time_series_daily: secs("TP_TTL_DAILY_SECS", DEFAULT_DAILY_TTL),
            },
            cors_allow,
            request_timeout: millis("TP_REQUEST_TIMEOUT_MS", Duration::from_millis(30_000)),
        })
    }
}
