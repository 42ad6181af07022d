//! Build the configured cache medium.

use tracing::info;

use crate::config::{CacheBackend, CacheConfig};

use super::response_cache::ResponseCache;
use super::store::{FileStore, KvStore, MemoryStore};

/// Create the medium named by `config.backend`.
///
/// A disabled cache still gets a medium: one that fails every call, so the
/// chat flow runs its normal always-miss path.
pub fn create_store(config: &CacheConfig) -> Box<dyn KvStore> {
    if !config.enabled {
        info!("Reply cache disabled");
        return Box::new(MemoryStore::disabled());
    }
    match config.backend {
        CacheBackend::File => {
            let path = config.resolved_path();
            info!(path = %path.display(), "Reply cache on file medium");
            Box::new(FileStore::open(path, config.quota_bytes))
        }
        CacheBackend::Memory => match config.quota_bytes {
            Some(quota) => Box::new(MemoryStore::with_quota(quota)),
            None => Box::new(MemoryStore::new()),
        },
    }
}

/// Create a [`ResponseCache`] over the configured medium and TTL.
pub fn create_cache(config: &CacheConfig) -> ResponseCache<Box<dyn KvStore>> {
    ResponseCache::new(create_store(config), config.ttl())
}
