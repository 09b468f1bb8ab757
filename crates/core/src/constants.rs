use std::time::Duration;

/// Freshness window for company overviews, which change rarely.
pub const DEFAULT_OVERVIEW_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Freshness window for the daily series, which changes once per trading day.
pub const DEFAULT_DAILY_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Retry delay reported for throttles when the upstream gives none (seconds).
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;
