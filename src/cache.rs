//! Explicit memo cache.
//!
//! Maps `(function, key)` to a JSON value and the time it was stored.
//! Lookups pass their own freshness window; `None` means the entry never
//! goes stale. The cache can be persisted to a JSON file so external
//! lookups survive between runs.

use crate::config::{CacheConfig, cache_dir};
use crate::constants::cache::FILE_NAME;
use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    function: String,
    key: String,
    value: serde_json::Value,
    stored_at: DateTime<Utc>,
}

impl Entry {
    fn is_fresh(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = ttl else {
            return true;
        };
        TimeDelta::from_std(ttl).is_ok_and(|ttl| now - self.stored_at <= ttl)
    }
}

type Key = (String, String);

/// Memo cache keyed by function identity and argument key.
#[derive(Debug, Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<Key, Entry>>,
    path: Option<PathBuf>,
}

impl TtlCache {
    /// Cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache backed by a JSON file; entries already on disk are loaded.
    ///
    /// An unreadable or corrupt file is logged and ignored.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring cache file: {e}");
                HashMap::new()
            }
        };
        debug!("Loaded {} cache entries from {}", entries.len(), path.display());
        Self {
            entries: Mutex::new(entries),
            path: Some(path),
        }
    }

    /// Build the cache described by the configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        if config.persist {
            Ok(Self::persistent(cache_dir()?.join(FILE_NAME)))
        } else {
            Ok(Self::in_memory())
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh value stored for `(function, key)`, if any.
    pub fn get<T: DeserializeOwned>(&self, function: &str, key: &str, ttl: Option<Duration>) -> Option<T> {
        let entries = self.lock();
        let entry = entries.get(&(function.to_string(), key.to_string()))?;
        if !entry.is_fresh(ttl, Utc::now()) {
            debug!("Cache stale: {function}({key})");
            return None;
        }
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => {
                debug!("Cache hit: {function}({key})");
                Some(value)
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry {function}({key}): {e}");
                None
            }
        }
    }

    /// Store `value` for `(function, key)`, stamped with the current time.
    pub fn insert<T: Serialize>(&self, function: &str, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!("Not caching {function}({key}): {e}");
                return;
            }
        };
        self.lock().insert(
            (function.to_string(), key.to_string()),
            Entry {
                function: function.to_string(),
                key: key.to_string(),
                value,
                stored_at: Utc::now(),
            },
        );
    }

    /// Return the fresh cached value, or compute, store and return it.
    pub fn get_or_insert_with<T, F>(&self, function: &str, key: &str, ttl: Option<Duration>, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get(function, key, ttl) {
            return value;
        }
        debug!("Cache miss: {function}({key})");
        let value = compute();
        self.insert(function, key, &value);
        value
    }

    /// Drop every entry of one function.
    pub fn invalidate_function(&self, function: &str) {
        self.lock().retain(|(f, _), _| f != function);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries, fresh or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Backing file, if persistent.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write entries to the backing file. In-memory caches do nothing.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let entries: Vec<Entry> = self.lock().values().cloned().collect();
        let content = serde_json::to_string(&entries).map_err(|e| Error::CacheWrite {
            path: path.clone(),
            source: Box::new(e),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::CacheWrite {
                path: path.clone(),
                source: Box::new(e),
            })?;
        }
        std::fs::write(path, content).map_err(|e| Error::CacheWrite {
            path: path.clone(),
            source: Box::new(e),
        })?;
        debug!("Saved {} cache entries to {}", entries.len(), path.display());
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<HashMap<Key, Entry>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| Error::CacheRead {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    let entries: Vec<Entry> = serde_json::from_str(&content).map_err(|e| Error::CacheRead {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    Ok(entries
        .into_iter()
        .map(|e| ((e.function.clone(), e.key.clone()), e))
        .collect())
}
