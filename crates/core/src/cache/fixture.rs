//! Read-only fixture tier, the last resort before an error.
//!
//! Fixtures use the same file names as the disk tier. A fixture file may hold
//! the raw upstream payload or a wrapper exposing it under `"data"` (which is
//! also what a copied disk cache record looks like).

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_json::Value;
use tickerproxy_market_data::CacheKey;

use super::model::FixtureRecord;

/// Field under which wrapped fixtures carry their payload.
const WRAPPER_FIELD: &str = "data";

#[derive(Debug, Clone)]
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn read(&self, key: &CacheKey) -> Option<FixtureRecord> {
        let path = self.dir.join(key.file_name());
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No fixture for {}", key);
                return None;
            }
            Err(e) => {
                warn!("Fixture read failed for {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<Value>(&raw) {
            Ok(value) => Some(FixtureRecord {
                key: key.clone(),
                payload: unwrap_fixture(value),
            }),
            Err(e) => {
                warn!("Ignoring malformed fixture {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Accept both raw payloads and `{"data": payload, ...}` wrappers.
///
/// Upstream payloads never carry a top-level `data` field, so its presence
/// identifies a wrapper.
fn unwrap_fixture(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(WRAPPER_FIELD) => {
            map.remove(WRAPPER_FIELD).unwrap_or(Value::Null)
        }
        other => other,
    }
}
