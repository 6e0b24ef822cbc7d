//! Local cache: last-known-good config text per storage key.
//!
//! DESIGN
//! ======
//! `LocalCache` sits in front of a `KeyValueStore` backend and owns the
//! size ceiling. Oversized payloads are refused before the backend is
//! touched, so a failed save never leaves a truncated value behind.
//!
//! Backends:
//! - `MemoryStore`: process-local map with an optional total quota.
//! - `FileStore`: one JSON file per key, written via temp file + rename.
//!
//! A detached cache (`LocalCache::detached`) models a context with no
//! storage at all: reads miss and writes report `Unavailable`.
//!
//! ERROR HANDLING
//! ==============
//! Reads and removes never fail to the caller; backend errors are logged
//! and mapped to a miss / no-op. Writes return `CacheError` so the store
//! can turn them into its failure signal.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use uuid::Uuid;

/// Default ceiling for one serialized config (4.5 MiB).
pub const DEFAULT_CACHE_MAX_BYTES: usize = 4_718_592;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("payload of {size} bytes exceeds the {limit} byte cache limit")]
    SizeExceeded { size: usize, limit: usize },
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("local storage is not available")]
    Unavailable,
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// BACKENDS
// =============================================================================

/// Raw string key/value persistence.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// # Errors
    ///
    /// Returns an error if the value could not be stored in full.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// # Errors
    ///
    /// Returns an error if an existing value could not be removed.
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process map. `quota` bounds the total bytes across all keys.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self { entries: Mutex::new(HashMap::new()), quota: Some(quota) }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(CacheError::QuotaExceeded);
            }
        }
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: `<root>/<encoded key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.root)?;
        let target = self.path_for(key);
        let tmp = self.root.join(format!(".{}.{}.tmp", encode_key(key), Uuid::new_v4()));

        if let Err(e) = std::fs::write(&tmp, value).and_then(|()| std::fs::rename(&tmp, &target)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Percent-encode everything outside `[A-Za-z0-9._-]` so keys such as
/// `aiMaster:solutions` map to portable, collision-free file names.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

// =============================================================================
// LOCAL CACHE
// =============================================================================

#[derive(Clone)]
pub struct LocalCache {
    backend: Option<Arc<dyn KeyValueStore>>,
    max_bytes: usize,
}

impl LocalCache {
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, max_bytes: usize) -> Self {
        Self { backend: Some(backend), max_bytes }
    }

    /// In-memory cache with the default ceiling.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), DEFAULT_CACHE_MAX_BYTES)
    }

    /// Cache with no storage behind it.
    #[must_use]
    pub fn detached() -> Self {
        Self { backend: None, max_bytes: 0 }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Raw text under `key`, or `None` on a miss or any backend failure.
    #[must_use]
    pub fn read(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "local cache read failed");
                None
            }
        }
    }

    /// Store `text` under `key` in full, or not at all.
    ///
    /// # Errors
    ///
    /// Returns `SizeExceeded` without touching the backend when `text` is
    /// over the ceiling, `Unavailable` for a detached cache, or the backend
    /// error if the write itself fails.
    pub fn write(&self, key: &str, text: &str) -> Result<(), CacheError> {
        let Some(backend) = &self.backend else {
            return Err(CacheError::Unavailable);
        };
        if text.len() > self.max_bytes {
            return Err(CacheError::SizeExceeded { size: text.len(), limit: self.max_bytes });
        }
        backend.set(key, text)?;
        debug!(key, bytes = text.len(), "local cache written");
        Ok(())
    }

    /// Best-effort delete.
    pub fn remove(&self, key: &str) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(e) = backend.delete(key) {
            warn!(key, error = %e, "local cache remove failed");
        }
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("available", &self.is_available())
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
