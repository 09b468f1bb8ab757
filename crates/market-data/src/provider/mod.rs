//! Upstream provider abstraction and implementation.
//!
//! This module contains:
//! - The `UpstreamProvider` trait the proxy calls through
//! - Response classification shared by providers
//! - The Alpha Vantage client

pub mod alpha_vantage;
pub mod classify;
mod traits;

pub use classify::{classify_payload, classify_response, UpstreamPayload};
pub use traits::UpstreamProvider;
