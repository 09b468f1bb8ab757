//! Alpha Vantage upstream client.
//!
//! Forwards `OVERVIEW` and `TIME_SERIES_DAILY` calls and returns the upstream
//! JSON untouched. The free tier allows only a handful of calls per minute,
//! which is why every call goes through the scheduler lane.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::errors::UpstreamError;
use crate::models::CacheKey;
use crate::provider::classify::classify_response;
use crate::provider::UpstreamProvider;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Alpha Vantage upstream client.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl AlphaVantageProvider {
    /// Create a client against the public endpoint with the default timeout.
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, DEFAULT_BASE_URL.to_string(), DEFAULT_TIMEOUT)
    }

    /// Create a client against a custom endpoint.
    pub fn with_endpoint(api_key: String, base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(concat!("tickerproxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url,
            timeout,
        }
    }

    /// Build the request URL for `key`.
    fn build_url(&self, key: &CacheKey) -> Result<Url, UpstreamError> {
        let mut params: Vec<(&str, &str)> = vec![
            ("function", key.operation.as_str()),
            ("symbol", key.symbol.as_str()),
        ];
        params.extend_from_slice(key.operation.extra_params());
        params.push(("apikey", &self.api_key));

        Url::parse_with_params(&self.base_url, &params).map_err(|e| UpstreamError::Transport {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to build URL: {}", e),
        })
    }

    fn map_send_error(e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout {
                provider: PROVIDER_ID.to_string(),
            }
        } else {
            UpstreamError::Transport {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl UpstreamProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch(&self, key: &CacheKey) -> Result<Value, UpstreamError> {
        let url = self.build_url(key)?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        // The per-request timeout covers connect, headers and body, and is
        // dropped with the request future on every path.
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body = response.text().await.map_err(Self::map_send_error)?;

        debug!(
            "Alpha Vantage: {} answered HTTP {} ({} bytes)",
            key,
            status,
            body.len()
        );

        classify_response(PROVIDER_ID, status, retry_after, &body)
    }
}
