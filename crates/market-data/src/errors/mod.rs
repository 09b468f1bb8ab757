//! Error types and failure classification for the market data crate.
//!
//! This module provides:
//! - [`ValidationError`]: Rejected request parameters (never retried, never cached)
//! - [`UpstreamError`]: Everything that can go wrong talking to the upstream API
//! - [`FailureClass`]: Coarse classification driving fallback and status codes

mod class;

pub use class::FailureClass;

use thiserror::Error;

/// Errors raised while validating incoming request parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required query parameter was absent or blank.
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// The operation is not on the allow-list.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The symbol does not match the ticker pattern.
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),
}

/// Errors that can occur while calling the upstream API.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    /// The upstream signalled a quota or call-frequency limit.
    /// `retry_after` carries the delay the upstream asked for, in seconds.
    #[error("Rate limited: {provider} - {message}")]
    Throttled {
        provider: String,
        message: String,
        retry_after: Option<u64>,
    },

    /// The upstream answered with an error marker or a non-OK HTTP status.
    #[error("Provider error: {provider} - {message}")]
    Rejected {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The body could not be parsed as JSON.
    #[error("Malformed response: {provider} - {message}")]
    Malformed { provider: String, message: String },

    /// The request did not complete within the configured timeout.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// The request failed before any response was received.
    #[error("Network error: {provider} - {message}")]
    Transport { provider: String, message: String },

    /// The scheduler lane is gone, so no call could be made.
    #[error("Upstream scheduler is not running")]
    LaneClosed,
}

impl UpstreamError {
    /// Returns the failure classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerproxy_market_data::errors::{FailureClass, UpstreamError};
    ///
    /// let error = UpstreamError::Timeout { provider: "ALPHA_VANTAGE".to_string() };
    /// assert_eq!(error.failure_class(), FailureClass::Timeout);
    /// ```
    pub fn failure_class(&self) -> FailureClass {
        match self {
            Self::Throttled { .. } => FailureClass::Throttled,
            Self::Rejected { .. } => FailureClass::Rejected,
            Self::Malformed { .. } => FailureClass::Malformed,
            Self::Timeout { .. } => FailureClass::Timeout,
            Self::Transport { .. } | Self::LaneClosed => FailureClass::Transport,
        }
    }

    /// Delay requested by the upstream, if this is a throttle that carried one.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Throttled { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
