//! Request orchestration.
//!
//! - [`envelope`] - Response envelope, data source labels and header hints
//! - [`fallback`] - Fallback chain walked after an upstream failure
//! - [`service`] - The per-request state machine

pub mod envelope;
pub mod fallback;
pub mod service;


pub use envelope::{CacheDirective, DataSource, ProxyResponse, ResponseEnvelope};
pub use fallback::FallbackOrchestrator;
pub use service::{ProxyService, ProxyServiceTrait};
