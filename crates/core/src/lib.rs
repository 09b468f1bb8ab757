//! Tickerproxy Core - cache tiers, fallback chain and the proxy state machine.
//!
//! This crate contains the resilience engine behind the HTTP surface. It is
//! transport-agnostic: handlers get back a [`ProxyResponse`] carrying the
//! envelope, the status code and the header hints, and render it themselves.

pub mod cache;
pub mod constants;
pub mod errors;
pub mod proxy;

pub use cache::{
    fixture_stamp, CacheEntry, CacheSource, CacheTiers, DiskCache, FixtureRecord, FixtureStore,
    MemoryCache, TtlPolicy,
};
pub use proxy::{
    CacheDirective, DataSource, FallbackOrchestrator, ProxyResponse, ProxyService,
    ProxyServiceTrait, ResponseEnvelope,
};

// Re-export error types
pub use errors::{ProxyError, Result};
