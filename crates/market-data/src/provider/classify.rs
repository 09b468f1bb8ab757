//! Classification of raw upstream responses.
//!
//! The upstream reports quota problems and bad requests inside an HTTP 200
//! JSON body, so the status code alone says little. Classification is split
//! in two pure steps:
//!
//! 1. [`classify_payload`] looks at a parsed body and turns marker fields into
//!    an [`UpstreamPayload`] variant.
//! 2. [`classify_response`] combines the HTTP status, any `Retry-After` hint
//!    and the raw body into the final `Result`.

use serde_json::Value;

use crate::errors::UpstreamError;

/// Marker fields signalling a call-frequency or daily quota limit.
const THROTTLE_MARKERS: [&str; 2] = ["Note", "Information"];

/// Marker field signalling a rejected call (bad symbol, bad function, ...).
const ERROR_MARKER: &str = "Error Message";

const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// A parsed upstream body, by what it means rather than how it looks.
#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamPayload {
    Success(Value),
    Throttled(String),
    ErrorMarker(String),
}

/// Inspect a parsed body for throttle and error markers.
///
/// Throttle markers win over the error marker. An empty object is what the
/// upstream sends for unknown symbols on some functions, so it counts as an
/// error rather than data worth caching.
pub fn classify_payload(value: Value) -> UpstreamPayload {
    if let Value::Object(map) = &value {
        for marker in THROTTLE_MARKERS {
            if let Some(message) = map.get(marker) {
                return UpstreamPayload::Throttled(marker_text(message));
            }
        }
        if let Some(message) = map.get(ERROR_MARKER) {
            return UpstreamPayload::ErrorMarker(marker_text(message));
        }
        if map.is_empty() {
            return UpstreamPayload::ErrorMarker("empty response".to_string());
        }
    }
    UpstreamPayload::Success(value)
}

/// Classify a complete HTTP response.
///
/// * `status` - HTTP status code
/// * `retry_after` - seconds from a `Retry-After` header, if present
/// * `body` - raw response body
pub fn classify_response(
    provider: &str,
    status: u16,
    retry_after: Option<u64>,
    body: &str,
) -> Result<Value, UpstreamError> {
    let is_ok = (200..300).contains(&status);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return Err(if status == HTTP_TOO_MANY_REQUESTS {
                throttled(provider, format!("HTTP {}", status), retry_after)
            } else if !is_ok {
                rejected(provider, status, format!("HTTP {}", status))
            } else {
                UpstreamError::Malformed {
                    provider: provider.to_string(),
                    message: e.to_string(),
                }
            });
        }
    };

    match classify_payload(value) {
        UpstreamPayload::Throttled(message) => Err(throttled(provider, message, retry_after)),
        _ if status == HTTP_TOO_MANY_REQUESTS => {
            Err(throttled(provider, format!("HTTP {}", status), retry_after))
        }
        UpstreamPayload::ErrorMarker(message) => Err(rejected(provider, status, message)),
        UpstreamPayload::Success(_) if !is_ok => {
            Err(rejected(provider, status, format!("HTTP {}", status)))
        }
        UpstreamPayload::Success(value) => Ok(value),
    }
}

fn marker_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn throttled(provider: &str, message: String, retry_after: Option<u64>) -> UpstreamError {
    UpstreamError::Throttled {
        provider: provider.to_string(),
        message,
        retry_after,
    }
}

fn rejected(provider: &str, status: u16, message: String) -> UpstreamError {
    UpstreamError::Rejected {
        provider: provider.to_string(),
        status: Some(status),
        message,
    }
}
