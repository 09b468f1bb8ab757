//! Process-lifetime memory tier.
//!
//! Uses `DashMap` so concurrent handlers never contend on a global lock.
//! There is no eviction: the key space is the ticker × operation product.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tickerproxy_market_data::CacheKey;

use super::model::{fixture_stamp, CacheEntry, CacheSource};

#[derive(Debug)]
struct Slot {
    payload: Value,
    saved_at: DateTime<Utc>,
    fixture: bool,
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, Slot>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, regardless of age.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|slot| CacheEntry {
            key: key.clone(),
            payload: slot.payload.clone(),
            saved_at: slot.saved_at,
            source: if slot.fixture {
                CacheSource::Fixture
            } else {
                CacheSource::Memory
            },
        })
    }

    /// Store `payload` under `key`. Last write wins.
    ///
    /// `saved_at` is passed in so a rehydration from disk keeps the original
    /// timestamp instead of making stale data look fresh.
    pub fn set(&self, key: &CacheKey, payload: Value, saved_at: DateTime<Utc>) {
        self.entries.insert(
            key.clone(),
            Slot {
                payload,
                saved_at,
                fixture: false,
            },
        );
    }

    /// Store a copy of seed data. It reads back as [`CacheSource::Fixture`]
    /// and is never fresh.
    pub fn set_fixture(&self, key: &CacheKey, payload: Value) {
        self.entries.insert(
            key.clone(),
            Slot {
                payload,
                saved_at: fixture_stamp(),
                fixture: true,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tickerproxy_market_data::{Operation, Symbol};

    fn key(symbol: &str) -> CacheKey {
        CacheKey::new(Operation::Overview, Symbol::parse(symbol).unwrap())
    }

    #[test]
    fn test_get_missing() {
        let cache = MemoryCache::new();
        assert!(cache.get(&key("IBM")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_then_get() {
        let cache = MemoryCache::new();
        let saved_at = Utc::now();
        cache.set(&key("IBM"), json!({"Symbol": "IBM"}), saved_at);

        let entry = cache.get(&key("IBM")).unwrap();
        assert_eq!(entry.payload, json!({"Symbol": "IBM"}));
        assert_eq!(entry.saved_at, saved_at);
        assert_eq!(entry.source, CacheSource::Memory);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = MemoryCache::new();
        cache.set(&key("IBM"), json!({"v": 1}), Utc::now());
        cache.set(&key("IBM"), json!({"v": 2}), Utc::now());

        assert_eq!(cache.get(&key("IBM")).unwrap().payload, json!({"v": 2}));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fixture_copy_is_marked_and_expired() {
        let cache = MemoryCache::new();
        cache.set_fixture(&key("IBM"), json!({"Name": "Sample"}));

        let entry = cache.get(&key("IBM")).unwrap();
        assert_eq!(entry.source, CacheSource::Fixture);
        assert_eq!(entry.saved_at, fixture_stamp());
        assert!(!entry.is_fresh(Utc::now(), std::time::Duration::from_secs(86_400)));

        // A live write replaces the marker.
        cache.set(&key("IBM"), json!({"Name": "Live"}), Utc::now());
        assert_eq!(cache.get(&key("IBM")).unwrap().source, CacheSource::Memory);
    }

    #[test]
    fn test_keys_are_isolated() {
        let cache = MemoryCache::new();
        cache.set(&key("IBM"), json!({"v": 1}), Utc::now());
        assert!(cache.get(&key("MSFT")).is_none());
        assert!(cache
            .get(&CacheKey::new(
                Operation::TimeSeriesDaily,
                Symbol::parse("IBM").unwrap()
            ))
            .is_none());
    }
}
