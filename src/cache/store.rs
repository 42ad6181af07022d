//! String key-value media for the response cache.
//!
//! A medium is a plain `String -> String` store with an optional byte quota and
//! no expiration of its own. Failures are reported as [`StoreError`] so the
//! cache can decide to swallow them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Failure of the underlying medium.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing would exceed the medium's capacity.
    #[error("storage quota exceeded ({used} + {requested} > {quota} bytes)")]
    QuotaExceeded {
        used: usize,
        requested: usize,
        quota: usize,
    },
    /// The medium is disabled or otherwise not usable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A string-keyed, string-valued persistent medium.
pub trait KvStore: Send {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()>;
    fn remove_item(&mut self, key: &str) -> StoreResult<()>;
    /// All keys currently held, in no particular order.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> StoreResult<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }
}

/// Bytes a map would occupy after replacing `key` with `value`.
fn projected_usage(map: &HashMap<String, String>, key: &str, value: &str) -> (usize, usize) {
    let used: usize = map
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
    (used, key.len() + value.len())
}

fn check_quota(quota: Option<usize>, used: usize, requested: usize) -> StoreResult<()> {
    match quota {
        Some(quota) if used + requested > quota => Err(StoreError::QuotaExceeded {
            used,
            requested,
            quota,
        }),
        _ => Ok(()),
    }
}

// ── In-memory medium ─────────────────────────────────────────────────────────

/// Process-local medium. Can be capped or disabled to exercise failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
    quota_bytes: Option<usize>,
    disabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes that would push it past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// A store where every operation fails with [`StoreError::Unavailable`].
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn ensure_enabled(&self) -> StoreResult<()> {
        if self.disabled {
            Err(StoreError::Unavailable("memory store disabled".into()))
        } else {
            Ok(())
        }
    }
}

impl KvStore for MemoryStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.ensure_enabled()?;
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.ensure_enabled()?;
        let (used, requested) = projected_usage(&self.items, key, value);
        check_quota(self.quota_bytes, used, requested)?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StoreResult<()> {
        self.ensure_enabled()?;
        self.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        self.ensure_enabled()?;
        Ok(self.items.keys().cloned().collect())
    }
}

// ── File-backed medium ───────────────────────────────────────────────────────

/// Medium persisted as one JSON object per profile.
///
/// Every mutation rewrites the file through a temp file in the same directory
/// and an atomic rename. A failed write leaves both the file and the in-memory
/// map unchanged.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    items: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl FileStore {
    /// Open the store at `path`, starting empty when the file is missing or corrupt.
    pub fn open(path: impl Into<PathBuf>, quota_bytes: Option<usize>) -> Self {
        let path = path.into();
        let items = Self::load_from_disk(&path);
        Self {
            path,
            items,
            quota_bytes,
        }
    }

    fn load_from_disk(path: &Path) -> HashMap<String, String> {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Cache store file is corrupt, starting empty: {}", e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Failed to read cache store, starting empty: {}", e);
                HashMap::new()
            }
        }
    }

    fn save_to_disk(&self, items: &HashMap<String, String>) -> StoreResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let data = serde_json::to_vec(items)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        std::io::Write::write_all(&mut tmp, &data)?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        debug!(path = %self.path.display(), entries = items.len(), "Cache store flushed");
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let (used, requested) = projected_usage(&self.items, key, value);
        check_quota(self.quota_bytes, used, requested)?;
        let mut next = self.items.clone();
        next.insert(key.to_string(), value.to_string());
        self.save_to_disk(&next)?;
        self.items = next;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StoreResult<()> {
        if !self.items.contains_key(key) {
            return Ok(());
        }
        let mut next = self.items.clone();
        next.remove(key);
        self.save_to_disk(&next)?;
        self.items = next;
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.items.keys().cloned().collect())
    }
}
