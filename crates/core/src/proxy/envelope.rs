//! Response envelope and transport hints.
//!
//! The proxy never answers with a bare upstream body or an exception: every
//! outcome is a [`ResponseEnvelope`], paired with a status code and header
//! hints in a [`ProxyResponse`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProxyError;

/// Where the data in a successful envelope came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    Upstream,
    Memory,
    Disk,
    DiskStale,
    Fixture,
}

/// JSON body returned to callers.
///
/// ```text
/// { "ok": true,  "data": ..., "cached": bool, "stale": bool, "source": "...", "warning"?: "..." }
/// { "ok": false, "error": "..." }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Success {
        ok: bool,
        data: Value,
        cached: bool,
        stale: bool,
        source: DataSource,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    Failure {
        ok: bool,
        error: String,
    },
}

impl ResponseEnvelope {
    pub fn success(
        data: Value,
        source: DataSource,
        cached: bool,
        stale: bool,
        warning: Option<String>,
    ) -> Self {
        Self::Success {
            ok: true,
            data,
            cached,
            stale,
            source,
            warning,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            ok: false,
            error: error.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn source(&self) -> Option<DataSource> {
        match self {
            Self::Success { source, .. } => Some(*source),
            Self::Failure { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Success { stale: true, .. })
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Success { cached: true, .. })
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Success { warning, .. } => warning.as_deref(),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error, .. } => Some(error),
            Self::Success { .. } => None,
        }
    }
}

/// What shared caches in front of the proxy may do with a response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheDirective {
    /// Live or fresh data; cacheable for the operation's TTL.
    Public { max_age: Duration },
    /// Degraded or failed responses must not be cached downstream.
    NoStore,
}

impl CacheDirective {
    pub const NO_STORE: &'static str = "no-store";

    pub fn header_value(&self) -> String {
        match self {
            Self::Public { max_age } => {
                let secs = max_age.as_secs();
                format!("public, s-maxage={secs}, stale-while-revalidate={secs}")
            }
            Self::NoStore => Self::NO_STORE.to_string(),
        }
    }
}

/// Envelope plus transport-level hints, ready to be rendered by a handler.
#[derive(Clone, Debug, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub envelope: ResponseEnvelope,
    /// Seconds for a `Retry-After` header.
    pub retry_after: Option<u64>,
    pub cache: CacheDirective,
}

impl ProxyResponse {
    /// Live upstream data or a fresh cache hit.
    pub fn fresh(data: Value, source: DataSource, ttl: Duration) -> Self {
        let cached = source != DataSource::Upstream;
        Self {
            status: 200,
            envelope: ResponseEnvelope::success(data, source, cached, false, None),
            retry_after: None,
            cache: CacheDirective::Public { max_age: ttl },
        }
    }

    /// Data served from a fallback source after an upstream failure.
    pub fn degraded(
        data: Value,
        source: DataSource,
        stale: bool,
        warning: String,
        retry_after: Option<u64>,
    ) -> Self {
        Self {
            status: 200,
            envelope: ResponseEnvelope::success(data, source, true, stale, Some(warning)),
            retry_after,
            cache: CacheDirective::NoStore,
        }
    }

    /// Terminal failure.
    pub fn error(error: &ProxyError) -> Self {
        Self {
            status: error.status_code(),
            envelope: ResponseEnvelope::failure(error.to_string()),
            retry_after: error.retry_after(),
            cache: CacheDirective::NoStore,
        }
    }
}
