//! Track cache - freshness gatekeeping around the songs.json file
//!
//! The cache file's own modification time is the freshness signal. Reads
//! never fail outward: a missing or unreadable file degrades to the empty
//! collection, and a failed refresh leaves whatever is on disk authoritative.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::sync::SyncError;
use crate::models::{TrackCollection, TrackEntry};

/// Cache write failure, logged by the sync engine; the old file stays
/// authoritative.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("serializing cache payload failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("writing cache file failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Gatekeeper, loader and writer for the track cache file
#[derive(Debug, Clone)]
pub struct TrackCache {
    path: PathBuf,
    max_age: Duration,
}

impl TrackCache {
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.cache_file.clone(),
            max_age: config.max_cache_age(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the cache file is missing or older than the threshold.
    ///
    /// A zero threshold means every read refreshes.
    pub fn is_stale(&self) -> bool {
        if self.max_age.is_zero() {
            return true;
        }

        let modified = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return true,
        };

        match SystemTime::now().duration_since(modified) {
            Ok(age) => age > self.max_age,
            // a modification time in the future counts as fresh
            Err(_) => false,
        }
    }

    /// Run the refresh operation if the cache is stale, absorbing any
    /// failure. The caller reads whatever is on disk afterwards, which may
    /// still be stale data or nothing at all.
    pub async fn ensure_fresh<F, Fut>(&self, refresh: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), SyncError>>,
    {
        if !self.is_stale() {
            return;
        }

        info!("cache file is stale or missing, running auto-sync");
        if let Err(e) = refresh().await {
            error!("auto-sync failed: {}", e);
        }
    }

    /// Read the cache file into a collection.
    ///
    /// Absent or unparsable files yield the empty collection; a bare-array
    /// file from the old format is folded into the `recent` key. Entries
    /// themselves are not validated.
    pub fn load(&self) -> TrackCollection {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return TrackCollection::default(),
        };

        match serde_json::from_str::<Value>(&content) {
            // old format: a bare array of recent entries
            Ok(Value::Array(entries)) => TrackCollection {
                recent: serde_json::from_value::<Vec<TrackEntry>>(Value::Array(entries))
                    .unwrap_or_default(),
                alltime: Vec::new(),
            },
            Ok(value) => serde_json::from_value::<TrackCollection>(value).unwrap_or_else(|e| {
                warn!("cache file has unexpected shape: {}", e);
                TrackCollection::default()
            }),
            Err(e) => {
                warn!("cache file is unreadable: {}", e);
                TrackCollection::default()
            }
        }
    }

    /// Replace the cache file with the given collection.
    ///
    /// Writes to a temp file in the same directory and renames it over the
    /// target, so a crash mid-write can never leave a torn file behind.
    pub fn store(&self, collection: &TrackCollection) -> Result<(), CacheError> {
        let payload = serde_json::to_string_pretty(collection)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(payload.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| CacheError::Io(e.error))?;

        Ok(())
    }
}
