//! Reply cache with TTL-on-read expiry over a string key-value medium.
//!
//! Keys are `chatbot_cache_` followed by the normalized query (trimmed,
//! lowercased). Values are a versioned JSON envelope carrying the reply payload
//! and its creation time in Unix milliseconds. An entry whose age reaches the
//! TTL is removed the next time it is read. There is no capacity bound and no
//! LRU: entries that are never read again stay until [`ResponseCache::purge_expired`]
//! or [`ResponseCache::clear`] runs.
//!
//! The cache never fails its caller. Medium errors are logged and counted;
//! reads degrade to misses and writes are dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::CatalogItem;
use crate::utils::text::{normalize_query, preview};

use super::store::{KvStore, StoreError};

/// Prefix shared by every key this cache writes to the medium.
pub const CACHE_PREFIX: &str = "chatbot_cache_";

/// Default time-to-live: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Envelope schema version. Entries with any other version read as misses.
const PAYLOAD_VERSION: u32 = 1;

/// Source of "now" in Unix milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// A cached bot reply: text plus the products matched for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<CatalogItem>>,
}

impl ReplyPayload {
    pub fn new(text: impl Into<String>, products: Vec<CatalogItem>) -> Self {
        Self {
            text: text.into(),
            products: if products.is_empty() {
                None
            } else {
                Some(products)
            },
        }
    }
}

/// What the medium actually stores under a key.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    v: u32,
    value: ReplyPayload,
    /// Creation time, Unix milliseconds.
    timestamp: i64,
}

/// Why a stored value could not be turned back into a payload.
#[derive(Debug, thiserror::Error)]
enum DecodeError {
    #[error("invalid envelope: {0}")]
    Json(serde_json::Error),
    #[error("unsupported envelope version {0}")]
    Version(u32),
}

fn encode(payload: &ReplyPayload, timestamp: i64) -> serde_json::Result<String> {
    serde_json::to_string(&CacheEnvelope {
        v: PAYLOAD_VERSION,
        value: payload.clone(),
        timestamp,
    })
}

fn decode(raw: &str) -> std::result::Result<CacheEnvelope, DecodeError> {
    let envelope: CacheEnvelope = serde_json::from_str(raw).map_err(DecodeError::Json)?;
    if envelope.v != PAYLOAD_VERSION {
        return Err(DecodeError::Version(envelope.v));
    }
    Ok(envelope)
}

/// Counters since the cache was constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Reads that found an entry past its TTL (also counted as misses).
    pub expired: u64,
    /// Reads that found an undecodable entry (also counted as misses).
    pub malformed: u64,
    /// Medium failures swallowed on read or write.
    pub storage_errors: u64,
}

/// TTL cache of bot replies keyed by normalized user query.
pub struct ResponseCache<S: KvStore> {
    store: S,
    ttl: Duration,
    clock: Clock,
    stats: CacheStats,
}

impl<S: KvStore> ResponseCache<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
            stats: CacheStats::default(),
        }
    }

    /// Replace the wall clock, e.g. with a controllable one in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Medium key for a query: prefix plus the normalized query.
    pub fn cache_key(query: &str) -> String {
        format!("{CACHE_PREFIX}{}", normalize_query(query))
    }

    /// Look up a reply. Expired or malformed entries are removed and read as `None`.
    pub fn get(&mut self, query: &str) -> Option<ReplyPayload> {
        let key = Self::cache_key(query);
        let raw = match self.store.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.stats.misses += 1;
                return None;
            }
            Err(e) => {
                log_store_failure("Cache read failed, treating as miss", &key, &e);
                self.stats.storage_errors += 1;
                self.stats.misses += 1;
                return None;
            }
        };

        let envelope = match decode(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(key = %preview(&key, 40), error = %e, "Malformed cache entry, removing");
                self.stats.malformed += 1;
                self.stats.misses += 1;
                self.remove_quietly(&key);
                return None;
            }
        };

        let now = (self.clock)();
        if self.is_expired(envelope.timestamp, now) {
            debug!(key = %preview(&key, 40), "Cache entry expired, removing");
            self.stats.expired += 1;
            self.stats.misses += 1;
            self.remove_quietly(&key);
            return None;
        }

        debug!(key = %preview(&key, 40), "Cache hit");
        self.stats.hits += 1;
        Some(envelope.value)
    }

    /// Store a reply, overwriting any previous entry for the same normalized query.
    pub fn set(&mut self, query: &str, payload: &ReplyPayload) {
        let key = Self::cache_key(query);
        let now = (self.clock)();
        let raw = match encode(payload, now) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set_item(&key, &raw) {
            log_store_failure("Cache write failed, reply not cached", &key, &e);
            self.stats.storage_errors += 1;
        }
    }

    /// Remove every expired or undecodable entry under the cache prefix.
    ///
    /// Returns how many entries were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = (self.clock)();
        let mut removed = 0;
        for key in self.prefixed_keys() {
            let stale = match self.store.get_item(&key) {
                Ok(Some(raw)) => match decode(&raw) {
                    Ok(envelope) => self.is_expired(envelope.timestamp, now),
                    Err(_) => true,
                },
                _ => false,
            };
            if stale && self.store.remove_item(&key).is_ok() {
                removed += 1;
            }
        }
        debug!(removed, "Purged stale cache entries");
        removed
    }

    /// Remove every entry under the cache prefix. Other keys are left alone.
    pub fn clear(&mut self) -> usize {
        let mut removed = 0;
        for key in self.prefixed_keys() {
            if self.store.remove_item(&key).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Number of entries under the cache prefix, expired ones included.
    pub fn len(&self) -> usize {
        self.prefixed_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // -- private helpers ---------------------------------------------------

    fn is_expired(&self, timestamp: i64, now: i64) -> bool {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(timestamp) >= ttl_ms
    }

    fn prefixed_keys(&self) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(CACHE_PREFIX))
                .collect(),
            Err(e) => {
                log_store_failure("Cache listing failed", CACHE_PREFIX, &e);
                Vec::new()
            }
        }
    }

    fn remove_quietly(&mut self, key: &str) {
        if let Err(e) = self.store.remove_item(key) {
            log_store_failure("Failed to remove stale cache entry", key, &e);
            self.stats.storage_errors += 1;
        }
    }
}

/// A disabled medium is a configuration choice, not a fault: keep it out of warn.
fn log_store_failure(message: &str, key: &str, error: &StoreError) {
    match error {
        StoreError::Unavailable(_) => {
            debug!(key = %preview(key, 40), error = %error, "Cache medium unavailable, skipping")
        }
        _ => warn!(key = %preview(key, 40), error = %error, "{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;
    use crate::cache::store::{FileStore, MemoryStore};
    use crate::catalog::Catalog;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tempfile::TempDir;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn test_cache() -> (ResponseCache<MemoryStore>, Arc<AtomicI64>) {
        let now = Arc::new(AtomicI64::new(1_700_000_000_000));
        let clock_now = Arc::clone(&now);
        let cache = ResponseCache::new(MemoryStore::new(), DEFAULT_TTL)
            .with_clock(Arc::new(move || clock_now.load(Ordering::SeqCst)));
        (cache, now)
    }

    fn payload_with_products() -> ReplyPayload {
        let items = Catalog::builtin().items()[..2].to_vec();
        ReplyPayload::new("Tenemos estos productos.", items)
    }

    #[test]
    fn test_cache_hit_miss() {
        let (mut cache, _) = test_cache();
        assert!(cache.get("hola").is_none());
        let payload = ReplyPayload::new("¡Hola!", vec![]);
        cache.set("hola", &payload);
        assert_eq!(cache.get("hola"), Some(payload));
    }

    #[test]
    fn test_round_trip_with_products() {
        let (mut cache, _) = test_cache();
        let payload = payload_with_products();
        cache.set("laptop", &payload);
        assert_eq!(cache.get("laptop"), Some(payload));
    }

    #[test]
    fn test_key_is_case_and_whitespace_insensitive() {
        let (mut cache, _) = test_cache();
        cache.set("Hello", &ReplyPayload::new("hi", vec![]));
        assert!(cache.get("  hello  ").is_some());
        assert_eq!(
            ResponseCache::<MemoryStore>::cache_key("  HeLLo "),
            "chatbot_cache_hello"
        );
    }

    #[test]
    fn test_last_write_wins() {
        let (mut cache, _) = test_cache();
        cache.set("q", &ReplyPayload::new("first", vec![]));
        cache.set("Q ", &ReplyPayload::new("second", vec![]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("q").unwrap().text, "second");
    }

    #[test]
    fn test_entry_valid_just_before_ttl() {
        let (mut cache, now) = test_cache();
        cache.set("q", &ReplyPayload::new("r", vec![]));
        now.fetch_add(24 * HOUR_MS - 1, Ordering::SeqCst);
        assert!(cache.get("q").is_some());
    }

    #[test]
    fn test_entry_expires_at_ttl_and_is_removed() {
        let (mut cache, now) = test_cache();
        cache.set("q", &ReplyPayload::new("r", vec![]));
        now.fetch_add(24 * HOUR_MS, Ordering::SeqCst);
        assert!(cache.get("q").is_none());
        assert!(cache.store().get_item("chatbot_cache_q").unwrap().is_none());
        let stats = cache.stats();
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let (cache, _) = test_cache();
        let mut cache = ResponseCache {
            ttl: Duration::ZERO,
            ..cache
        };
        cache.set("q", &ReplyPayload::new("r", vec![]));
        assert!(cache.get("q").is_none());
    }

    #[test]
    fn test_malformed_entry_is_miss_and_removed() {
        let (mut cache, _) = test_cache();
        cache
            .store_mut()
            .set_item("chatbot_cache_q", "{not json")
            .unwrap();
        assert!(cache.get("q").is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().malformed, 1);
    }

    #[test]
    fn test_legacy_unversioned_entry_is_miss() {
        let (mut cache, _) = test_cache();
        // Shape written by the old widget: value is a JSON string, no version
        let legacy = r#"{"value":"{\"text\":\"hi\",\"sender\":\"bot\"}","timestamp":1700000000000}"#;
        cache
            .store_mut()
            .set_item("chatbot_cache_q", legacy)
            .unwrap();
        assert!(cache.get("q").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_future_version_is_miss() {
        let (mut cache, _) = test_cache();
        let raw = r#"{"v":2,"value":{"text":"hi"},"timestamp":1700000000000}"#;
        cache.store_mut().set_item("chatbot_cache_q", raw).unwrap();
        assert!(cache.get("q").is_none());
    }

    #[test]
    fn test_quota_exceeded_set_is_silent() {
        let mut cache = ResponseCache::new(MemoryStore::with_quota(16), DEFAULT_TTL);
        cache.set("a long query text", &payload_with_products());
        assert!(cache.get("a long query text").is_none());
        assert_eq!(cache.stats().storage_errors, 1);
    }

    #[test]
    fn test_disabled_store_reads_as_miss() {
        let mut cache = ResponseCache::new(MemoryStore::disabled(), DEFAULT_TTL);
        cache.set("q", &ReplyPayload::new("r", vec![]));
        assert!(cache.get("q").is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().storage_errors, 2);
    }

    #[test]
    #[traced_test]
    fn test_disabled_store_does_not_warn() {
        let mut cache = ResponseCache::new(MemoryStore::disabled(), DEFAULT_TTL);
        cache.set("q", &ReplyPayload::new("r", vec![]));
        assert!(cache.get("q").is_none());
        assert!(logs_contain("Cache medium unavailable"));
        assert!(!logs_contain("Cache write failed"));
        assert!(!logs_contain("Cache read failed"));
    }

    #[test]
    #[traced_test]
    fn test_quota_failure_still_warns() {
        let mut cache = ResponseCache::new(MemoryStore::with_quota(16), DEFAULT_TTL);
        cache.set("a long query text", &payload_with_products());
        assert!(logs_contain("Cache write failed"));
    }

    #[test]
    fn test_purge_expired_only_touches_stale_prefixed_entries() {
        let (mut cache, now) = test_cache();
        cache.set("old", &ReplyPayload::new("r", vec![]));
        now.fetch_add(20 * HOUR_MS, Ordering::SeqCst);
        cache.set("new", &ReplyPayload::new("r", vec![]));
        cache.store_mut().set_item("unrelated", "keep").unwrap();
        cache
            .store_mut()
            .set_item("chatbot_cache_broken", "??")
            .unwrap();
        now.fetch_add(5 * HOUR_MS, Ordering::SeqCst);

        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.get("new").is_some());
        assert!(cache.store().get_item("unrelated").unwrap().is_some());
    }

    #[test]
    fn test_clear_leaves_foreign_keys() {
        let (mut cache, _) = test_cache();
        cache.set("a", &ReplyPayload::new("r", vec![]));
        cache.set("b", &ReplyPayload::new("r", vec![]));
        cache.store_mut().set_item("theme", "dark").unwrap();
        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.store().len(), 1);
    }

    #[test]
    fn test_payload_without_products_omits_field() {
        let raw = encode(&ReplyPayload::new("hi", vec![]), 1).unwrap();
        assert!(!raw.contains("products"));
        assert_eq!(decode(&raw).unwrap().value.products, None);
    }

    #[test]
    fn test_file_backed_cache_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("responses.json");
        let payload = payload_with_products();
        {
            let mut cache = ResponseCache::new(FileStore::open(&path, None), DEFAULT_TTL);
            cache.set("Laptop", &payload);
        }
        let mut cache = ResponseCache::new(FileStore::open(&path, None), DEFAULT_TTL);
        assert_eq!(cache.get("laptop"), Some(payload));
    }
}
