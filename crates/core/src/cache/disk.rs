//! Durable disk tier.
//!
//! One JSON record per key under the cache directory:
//!
//! ```text
//! {cache_dir}/OVERVIEW__IBM.json
//! {"savedAt":"2024-05-01T12:00:00Z","data":{...}}
//! ```
//!
//! Copies of fixture data are written with `"fixture":true` and the epoch as
//! `savedAt`, so they read back as [`CacheSource::Fixture`] and never as fresh.
//!
//! Everything here is best effort. A failed write is logged and dropped, and a
//! missing, unreadable or half-written record reads as absent. Records are
//! returned whatever their age; callers decide fresh hit vs stale fallback.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tickerproxy_market_data::CacheKey;

use super::model::{fixture_stamp, CacheEntry, CacheSource};

/// Distinguishes temp files of concurrent writers within this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const TEMP_SUFFIX: &str = ".tmp";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiskRecord {
    saved_at: DateTime<Utc>,
    data: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    fixture: bool,
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Read the record for `key`, or `None` if it is missing or unusable.
    pub async fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.record_path(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Disk cache miss for {}", key);
                return None;
            }
            Err(e) => {
                warn!("Disk cache read failed for {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<DiskRecord>(&raw) {
            Ok(record) => Some(CacheEntry {
                key: key.clone(),
                payload: record.data,
                saved_at: record.saved_at,
                source: if record.fixture {
                    CacheSource::Fixture
                } else {
                    CacheSource::Disk
                },
            }),
            Err(e) => {
                warn!("Discarding malformed disk cache record {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write `payload` for `key` stamped with the current time.
    pub async fn write(&self, key: &CacheKey, payload: &Value) {
        self.write_at(key, payload, Utc::now()).await
    }

    /// Write `payload` for `key` with an explicit timestamp. Never fails the
    /// caller; errors are logged.
    pub async fn write_at(&self, key: &CacheKey, payload: &Value, saved_at: DateTime<Utc>) {
        if let Err(e) = self.persist(key, payload, saved_at, false).await {
            warn!("Disk cache write failed for {}: {}", key, e);
        }
    }

    /// Write a copy of fixture data for `key`. Best effort like [`Self::write_at`].
    pub async fn write_fixture(&self, key: &CacheKey, payload: &Value) {
        if let Err(e) = self.persist(key, payload, fixture_stamp(), true).await {
            warn!("Disk cache write failed for {}: {}", key, e);
        }
    }

    /// Remove temp files left behind by writes interrupted before their
    /// rename. Returns how many were removed.
    pub async fn sweep_temp_files(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping temp sweep of {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Temp sweep of {} stopped: {}", self.dir.display(), e);
                    break;
                }
            };
            let name = entry.file_name();
            if !is_temp_name(&name.to_string_lossy()) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove {}: {}", entry.path().display(), e),
            }
        }
        if removed > 0 {
            info!("Removed {} stale temp files from {}", removed, self.dir.display());
        }
        removed
    }

    /// Write to a temp file in the same directory, then rename over the
    /// record so readers never observe a partial file.
    async fn persist(
        &self,
        key: &CacheKey,
        payload: &Value,
        saved_at: DateTime<Utc>,
        fixture: bool,
    ) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let record = DiskRecord {
            saved_at,
            data: payload.clone(),
            fixture,
        };
        let bytes = serde_json::to_vec(&record).map_err(io::Error::other)?;

        let target = self.record_path(key);
        let temp = self.dir.join(format!(
            ".{}.{}.{}{}",
            key.file_stem(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            TEMP_SUFFIX
        ));

        if let Err(e) = tokio::fs::write(&temp, &bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        debug!("Disk cache wrote {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}
