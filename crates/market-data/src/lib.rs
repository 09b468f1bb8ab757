//! Tickerproxy Market Data Crate
//!
//! Everything the proxy needs to talk to the upstream market-data API:
//! request validation, the upstream client, response classification and the
//! scheduler lane that serializes outbound calls.
//!
//! # Architecture
//!
//! ```text
//! raw query ──▶ validate_request ──▶ CacheKey
//!                                       │
//!                                       ▼
//!                              UpstreamScheduler   (one lane, FIFO, paced)
//!                                       │
//!                                       ▼
//!                              UpstreamProvider    (AlphaVantageProvider)
//!                                       │
//!                                       ▼
//!                     classify_response ──▶ Result<Value, UpstreamError>
//! ```
//!
//! # Core Types
//!
//! - [`CacheKey`] - `{operation, symbol}` identity of an upstream resource
//! - [`Operation`] - Allow-listed upstream functions
//! - [`Symbol`] - Validated ticker symbol
//! - [`UpstreamError`] - Upstream failure taxonomy, classified by [`FailureClass`]

pub mod errors;
pub mod models;
pub mod provider;
pub mod scheduler;
pub mod validator;

pub use errors::{FailureClass, UpstreamError, ValidationError};
pub use models::{CacheKey, Operation, Symbol, MAX_SYMBOL_LEN};
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::{classify_payload, classify_response, UpstreamPayload, UpstreamProvider};
pub use scheduler::{LanePermit, Turn, UpstreamScheduler, DEFAULT_MIN_SPACING};
pub use validator::validate_request;
