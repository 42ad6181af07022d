//! Reply caching with TTL-on-read expiry over a pluggable key-value medium.

pub mod factory;
pub mod response_cache;
pub mod store;

pub use factory::{create_cache, create_store};
pub use response_cache::{CacheStats, Clock, ReplyPayload, ResponseCache, CACHE_PREFIX, DEFAULT_TTL};
pub use store::{FileStore, KvStore, MemoryStore, StoreError, StoreResult};
