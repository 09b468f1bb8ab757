use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tickerproxy_market_data::{CacheKey, Operation};

use crate::constants::{DEFAULT_DAILY_TTL, DEFAULT_OVERVIEW_TTL};

/// Where a cache entry's payload came from.
///
/// `Fixture` marks a written-through copy of seed data, whichever tier holds
/// it. Such copies carry [`fixture_stamp`] and are never fresh.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    Memory,
    Disk,
    Fixture,
}

/// Timestamp given to fixture copies: 1970-01-01T00:00:00Z.
pub fn fixture_stamp() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// A time-stamped payload held by one of the cache tiers.
///
/// Freshness is always derived from `saved_at`; it is never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Value,
    pub saved_at: DateTime<Utc>,
    pub source: CacheSource,
}

impl CacheEntry {
    /// Age of the entry at `now`. Entries stamped in the future count as new.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.saved_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// `(now - saved_at) <= ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) <= ttl
    }
}

/// A pre-seeded payload. Has no timestamp and is never considered fresh.
#[derive(Clone, Debug, PartialEq)]
pub struct FixtureRecord {
    pub key: CacheKey,
    pub payload: Value,
}

/// Time-to-live per operation kind. The symbol plays no part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlPolicy {
    pub overview: Duration,
    pub time_series_daily: Duration,
}

impl TtlPolicy {
    pub fn ttl(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Overview => self.overview,
            Operation::TimeSeriesDaily => self.time_series_daily,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            overview: DEFAULT_OVERVIEW_TTL,
            time_series_daily: DEFAULT_DAILY_TTL,
        }
    }
}
