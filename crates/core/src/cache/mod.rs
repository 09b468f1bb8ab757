//! Cache tiers.
//!
//! - [`MemoryCache`] - in-process, fastest, lost on restart
//! - [`DiskCache`] - one JSON record per key, survives restarts
//! - [`FixtureStore`] - read-only seed data, last resort
//!
//! All three are shared by every request. They are built once at startup and
//! handed around in a [`CacheTiers`] bundle.

mod disk;
mod fixture;
mod memory;
mod model;

use std::sync::Arc;

pub use disk::DiskCache;
pub use fixture::FixtureStore;
pub use memory::MemoryCache;
pub use model::{fixture_stamp, CacheEntry, CacheSource, FixtureRecord, TtlPolicy};

/// Shared handles to every cache tier.
#[derive(Debug, Clone)]
pub struct CacheTiers {
    pub memory: Arc<MemoryCache>,
    pub disk: Arc<DiskCache>,
    pub fixtures: Arc<FixtureStore>,
}

impl CacheTiers {
    pub fn new(memory: MemoryCache, disk: DiskCache, fixtures: FixtureStore) -> Self {
        Self {
            memory: Arc::new(memory),
            disk: Arc::new(disk),
            fixtures: Arc::new(fixtures),
        }
    }
}
