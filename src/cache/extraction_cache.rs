//! Content-addressed cache for extraction results.
//!
//! Memoizes expensive extraction calls keyed by a fingerprint of the input.
//! Bounded in-memory LRU with an on-disk mirror: entries survive process
//! restarts and are rehydrated most-recently-modified-first on construction.

use lru::LruCache;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

const CACHE_EXT: &str = "cache";

/// Compute a deterministic fingerprint for extraction input.
///
/// Hashes the normalized text together with any parameters that affect the
/// extraction output (e.g. the entity-type vocabulary), so a vocabulary
/// change never serves stale results.
pub fn fingerprint(text: &str, params: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().to_lowercase().as_bytes());
    for param in params {
        hasher.update([0x1f]);
        hasher.update(param.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Thread-safe LRU cache of extraction results with a disk mirror.
///
/// Keys are fingerprints (hex digests from [`fingerprint`]), values are
/// arbitrary JSON. Disk records live under `dir` as `<fingerprint>.cache`;
/// disk I/O failures are logged and non-fatal, the in-memory cache stays
/// authoritative for the rest of the process.
pub struct ExtractionCache {
    dir: PathBuf,
    inner: Mutex<LruCache<String, Value>>,
}

impl ExtractionCache {
    /// Create a cache rooted at `dir`, rehydrating up to `max_size` persisted
    /// records (most recently modified first, which also seeds the LRU order).
    pub fn new(dir: impl Into<PathBuf>, max_size: usize) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let cap = NonZeroUsize::new(max_size.max(1)).expect("capacity is at least 1");
        let cache = Self {
            dir,
            inner: Mutex::new(LruCache::new(cap)),
        };
        cache.rehydrate(max_size.max(1));
        Ok(cache)
    }

    /// Get a cached value, marking it most-recently-used.
    ///
    /// Checks memory first; on miss, tries the disk mirror and re-inserts a
    /// found record in memory before returning it.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(value) = inner.get(key) {
            return Some(value.clone());
        }

        let path = self.record_path(key);
        if !path.exists() {
            return None;
        }
        match Self::read_record(&path) {
            Ok(value) => {
                self.insert_locked(&mut inner, key.to_string(), value.clone());
                Some(value)
            }
            Err(e) => {
                log::warn!("Failed to load cache record {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a value, writing to memory and then best-effort to disk.
    pub fn set(&self, key: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        self.insert_locked(&mut inner, key.to_string(), value.clone());

        let path = self.record_path(key);
        if let Err(e) = Self::write_record(&path, &value) {
            log::warn!("Failed to write cache record {}: {}", path.display(), e);
        }
    }

    /// Clear memory and remove all disk records (best-effort).
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
        for path in self.list_records() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Failed to delete cache record {}: {}", path.display(), e);
            }
        }
    }

    /// Number of entries currently held in memory.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Insert under the lock, deleting the disk mirror of any evicted entry.
    fn insert_locked(&self, inner: &mut LruCache<String, Value>, key: String, value: Value) {
        if let Some((evicted_key, _)) = inner.push(key.clone(), value) {
            // push returns the old value when the key was already present;
            // only a genuine eviction gets its mirror removed
            if evicted_key != key {
                let path = self.record_path(&evicted_key);
                if path.exists() {
                    if let Err(e) = std::fs::remove_file(&path) {
                        log::warn!(
                            "Failed to delete evicted cache record {}: {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, CACHE_EXT))
    }

    fn read_record(path: &Path) -> Result<Value> {
        let body = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn write_record(path: &Path, value: &Value) -> Result<()> {
        std::fs::write(path, serde_json::to_string(value)?)?;
        Ok(())
    }

    fn list_records(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to list cache dir {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == CACHE_EXT).unwrap_or(false))
            .collect()
    }

    /// Load up to `max_size` persisted records, newest mtime first. Inserting
    /// oldest-first leaves the most recent record most-recently-used.
    fn rehydrate(&self, max_size: usize) {
        let mut records: Vec<(std::time::SystemTime, PathBuf)> = self
            .list_records()
            .into_iter()
            .filter_map(|path| {
                let mtime = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((mtime, path))
            })
            .collect();
        records.sort_by(|a, b| b.0.cmp(&a.0));
        records.truncate(max_size);

        let mut inner = self.inner.lock().unwrap();
        let mut loaded = 0usize;
        for (_, path) in records.iter().rev() {
            let key = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            match Self::read_record(path) {
                Ok(value) => {
                    inner.push(key, value);
                    loaded += 1;
                }
                Err(e) => {
                    log::warn!("Failed to load cache record {}: {}", path.display(), e);
                }
            }
        }
        if loaded > 0 {
            log::info!("Extraction cache rehydrated: {} records", loaded);
        }
    }
}
