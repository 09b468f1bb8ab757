//! Core error types for the proxy.
//!
//! Only errors that end a request without any usable data live here. Local
//! cache I/O failures never reach this type: the cache tiers log them and
//! behave as if the entry were absent.

use thiserror::Error;
use tickerproxy_market_data::{FailureClass, UpstreamError, ValidationError};

use crate::constants::DEFAULT_RETRY_AFTER_SECS;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Caller-visible failure of a proxy request.
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upstream API key is not configured")]
    MissingCredential,

    #[error("{0}")]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::MissingCredential => 500,
            Self::Upstream(e) => match e.failure_class() {
                FailureClass::Throttled => 429,
                FailureClass::Timeout => 504,
                FailureClass::Rejected | FailureClass::Malformed | FailureClass::Transport => 502,
            },
        }
    }

    /// Seconds the caller should wait before retrying, for throttles only.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Upstream(e) if e.failure_class() == FailureClass::Throttled => {
                Some(e.retry_after().unwrap_or(DEFAULT_RETRY_AFTER_SECS))
            }
            _ => None,
        }
    }
}
