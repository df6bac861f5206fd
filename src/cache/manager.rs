//! TTL cache manager for bestseller API responses
//!
//! Provides a `CacheManager` that wraps payloads with a write timestamp,
//! persists them through a `KeyValueStore`, and enforces a 24-hour
//! freshness window: expired entries are evicted on read, and a bulk
//! cleanup pass removes everything past the window in one batch.
//!
//! The cache is an optimization layer, not an authoritative store, so
//! store failures never propagate: reads degrade to a miss, writes and
//! deletes degrade to a logged no-op.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::store::KeyValueStore;

/// Prefix applied to every cache key before it touches the store
///
/// The store is shared with unrelated application state; the prefix lets
/// `clear_all` and `cleanup_expired` enumerate only this cache's keys.
const CACHE_PREFIX: &str = "bestsellers_cache_";

/// Hours after which a cache record is considered expired
///
/// Shared by the read path and the cleanup path so both classify entries
/// identically.
const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Maximum age a record may reach and still be served as a stale fallback
const MAX_STALE_DAYS: i64 = 7;

/// Wire format for a persisted cache record
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord<T> {
    /// The cached payload
    data: T,
    /// Write time in epoch milliseconds, set once and never mutated
    timestamp: i64,
    /// The category key, embedded for diagnostics
    #[serde(rename = "categoryId")]
    category_id: String,
}

/// Timestamp-only view of a record, used by the cleanup path to compute
/// ages without deserializing payloads
#[derive(Debug, Deserialize)]
struct RecordStamp {
    timestamp: i64,
}

/// Metadata view of a record for diagnostics
#[derive(Debug, Deserialize)]
struct RecordMeta {
    timestamp: i64,
    #[serde(rename = "categoryId")]
    category_id: String,
}

/// Diagnostic description of one cache entry
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    /// The category key the entry was stored under
    pub category_id: String,
    /// Time elapsed since the entry was written
    pub age: Duration,
    /// Size of the serialized record in bytes
    pub size_bytes: usize,
}

/// Manages per-category TTL caching over a shared key/value store
///
/// All cache access funnels through this type; no other component touches
/// the namespaced store keys directly.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
}

impl CacheManager {
    /// Creates a cache manager over the given store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The freshness window applied by `get` and `cleanup_expired`
    pub fn freshness_window() -> Duration {
        Duration::hours(FRESHNESS_WINDOW_HOURS)
    }

    /// Returns the namespaced store key for a category
    fn cache_key(category_id: &str) -> String {
        format!("{CACHE_PREFIX}{category_id}")
    }

    /// Reads the cached payload for a category if present and fresh
    ///
    /// An expired or undecodable record is deleted from the store before
    /// returning `None`, so callers never observe an expired payload and
    /// storage does not accumulate dead entries. Store failures degrade to
    /// a miss.
    pub async fn get<T: DeserializeOwned>(&self, category_id: &str) -> Option<T> {
        let key = Self::cache_key(category_id);

        let raw = match self.store.get_item(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(category = category_id, "no cache entry");
                return None;
            }
            Err(err) => {
                error!(category = category_id, error = %err, "cache read failed");
                return None;
            }
        };

        let record: CacheRecord<T> = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(category = category_id, error = %err, "evicting undecodable cache record");
                self.evict(&key, category_id).await;
                return None;
            }
        };

        let age = age_of(record.timestamp);
        if age > Self::freshness_window() {
            debug!(
                category = category_id,
                age_minutes = age.num_minutes(),
                "cache entry expired, evicting"
            );
            self.evict(&key, category_id).await;
            return None;
        }

        debug!(
            category = category_id,
            valid_for_hours = (Self::freshness_window() - age).num_hours(),
            "cache hit"
        );
        Some(record.data)
    }

    /// Reads a cached payload ignoring the freshness window
    ///
    /// Serves the stale-fallback path after an upstream failure. Records
    /// older than the 7-day staleness bound are not returned; nothing is
    /// evicted here, that stays on the `get` and cleanup paths.
    pub async fn get_stale<T: DeserializeOwned>(&self, category_id: &str) -> Option<T> {
        let key = Self::cache_key(category_id);

        let raw = match self.store.get_item(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                error!(category = category_id, error = %err, "cache read failed");
                return None;
            }
        };

        let record: CacheRecord<T> = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(category = category_id, error = %err, "stale record is undecodable");
                return None;
            }
        };

        if age_of(record.timestamp) > Duration::days(MAX_STALE_DAYS) {
            debug!(category = category_id, "stale record is past the staleness bound");
            return None;
        }

        Some(record.data)
    }

    /// Stores a payload under a category key with the current timestamp
    ///
    /// Unconditionally overwrites any prior record. Failures are logged
    /// and swallowed.
    pub async fn set<T: Serialize>(&self, category_id: &str, data: &T) {
        let record = CacheRecord {
            data,
            timestamp: Utc::now().timestamp_millis(),
            category_id: category_id.to_string(),
        };

        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(err) => {
                error!(category = category_id, error = %err, "failed to serialize cache record");
                return;
            }
        };

        let key = Self::cache_key(category_id);
        match self.store.set_item(&key, &raw).await {
            Ok(()) => debug!(category = category_id, "stored cache entry"),
            Err(err) => error!(category = category_id, error = %err, "cache write failed"),
        }
    }

    /// Deletes one category's record regardless of freshness
    pub async fn clear(&self, category_id: &str) {
        let key = Self::cache_key(category_id);
        match self.store.remove_item(&key).await {
            Ok(()) => debug!(category = category_id, "cleared cache entry"),
            Err(err) => error!(category = category_id, error = %err, "cache clear failed"),
        }
    }

    /// Deletes every record in this cache's namespace
    ///
    /// Keys outside the namespace are left untouched.
    pub async fn clear_all(&self) {
        let keys = match self.store.get_all_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                error!(error = %err, "failed to enumerate store keys");
                return;
            }
        };

        let cache_keys: Vec<String> = keys
            .into_iter()
            .filter(|key| key.starts_with(CACHE_PREFIX))
            .collect();

        if cache_keys.is_empty() {
            return;
        }

        match self.store.multi_remove(&cache_keys).await {
            Ok(()) => debug!(count = cache_keys.len(), "cleared cached categories"),
            Err(err) => error!(error = %err, "bulk cache clear failed"),
        }
    }

    /// Removes every namespaced record older than the freshness window
    ///
    /// Reads each record's timestamp directly rather than through `get`,
    /// collects all expired keys, and deletes them in one batch. Records
    /// that no longer decode are removed as well. Returns the number of
    /// entries removed; running twice with no intervening writes returns 0
    /// the second time.
    pub async fn cleanup_expired(&self) -> usize {
        let keys = match self.store.get_all_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                error!(error = %err, "failed to enumerate store keys");
                return 0;
            }
        };

        let mut expired_keys = Vec::new();
        for key in keys.into_iter().filter(|k| k.starts_with(CACHE_PREFIX)) {
            let raw = match self.store.get_item(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    error!(key = %key, error = %err, "cache read failed during cleanup");
                    continue;
                }
            };

            match serde_json::from_str::<RecordStamp>(&raw) {
                Ok(stamp) if age_of(stamp.timestamp) > Self::freshness_window() => {
                    expired_keys.push(key);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(key = %key, error = %err, "removing undecodable cache record");
                    expired_keys.push(key);
                }
            }
        }

        if expired_keys.is_empty() {
            debug!("no expired cache entries to clean up");
            return 0;
        }

        match self.store.multi_remove(&expired_keys).await {
            Ok(()) => {
                debug!(count = expired_keys.len(), "cleaned up expired cache entries");
                expired_keys.len()
            }
            Err(err) => {
                error!(error = %err, "bulk cleanup failed");
                0
            }
        }
    }

    /// Returns diagnostic info for every namespaced record
    ///
    /// Read-only: expired or undecodable entries are reported or skipped
    /// but never evicted here.
    pub async fn get_info(&self) -> Vec<CacheEntryInfo> {
        let keys = match self.store.get_all_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                error!(error = %err, "failed to enumerate store keys");
                return Vec::new();
            }
        };

        let mut info = Vec::new();
        for key in keys.into_iter().filter(|k| k.starts_with(CACHE_PREFIX)) {
            let raw = match self.store.get_item(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    error!(key = %key, error = %err, "cache read failed");
                    continue;
                }
            };

            match serde_json::from_str::<RecordMeta>(&raw) {
                Ok(meta) => info.push(CacheEntryInfo {
                    category_id: meta.category_id,
                    age: age_of(meta.timestamp),
                    size_bytes: raw.len(),
                }),
                Err(err) => warn!(key = %key, error = %err, "skipping undecodable cache record"),
            }
        }
        info
    }

    /// Best-effort delete used by the read path
    async fn evict(&self, key: &str, category_id: &str) {
        if let Err(err) = self.store.remove_item(key).await {
            error!(category = category_id, error = %err, "cache eviction failed");
        }
    }
}

/// Age of a record written at `timestamp_ms` (epoch milliseconds)
fn age_of(timestamp_ms: i64) -> Duration {
    let written = DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now);
    Utc::now() - written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestPayload {
        name: String,
        value: i32,
    }

    fn payload(name: &str, value: i32) -> TestPayload {
        TestPayload {
            name: name.to_string(),
            value,
        }
    }

    fn create_test_cache() -> (CacheManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CacheManager::new(store.clone()), store)
    }

    /// Writes a record directly into the store with a back-dated timestamp
    async fn insert_aged(
        store: &MemoryStore,
        category_id: &str,
        data: &TestPayload,
        age_hours: i64,
    ) {
        let record = CacheRecord {
            data,
            timestamp: (Utc::now() - Duration::hours(age_hours)).timestamp_millis(),
            category_id: category_id.to_string(),
        };
        let key = CacheManager::cache_key(category_id);
        store
            .set_item(&key, &serde_json::to_string(&record).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_after_set_roundtrip() {
        let (cache, _store) = create_test_cache();
        let data = payload("roundtrip", 42);

        cache.set("electronics", &data).await;

        let result: Option<TestPayload> = cache.get("electronics").await;
        assert_eq!(result, Some(data));
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let (cache, _store) = create_test_cache();
        let result: Option<TestPayload> = cache.get("missing").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites_existing_record() {
        let (cache, _store) = create_test_cache();

        cache.set("books", &payload("first", 1)).await;
        cache.set("books", &payload("second", 2)).await;

        let result: Option<TestPayload> = cache.get("books").await;
        assert_eq!(result, Some(payload("second", 2)));
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_read() {
        let (cache, store) = create_test_cache();
        insert_aged(&store, "sports", &payload("old", 1), 25).await;

        let result: Option<TestPayload> = cache.get("sports").await;
        assert!(result.is_none());

        // The underlying store entry must be gone as well
        let key = CacheManager::cache_key("sports");
        assert!(store.get_item(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_within_window_is_served() {
        let (cache, store) = create_test_cache();
        insert_aged(&store, "sports", &payload("recent", 7), 23).await;

        let result: Option<TestPayload> = cache.get("sports").await;
        assert_eq!(result, Some(payload("recent", 7)));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_evicted_on_read() {
        let (cache, store) = create_test_cache();
        let key = CacheManager::cache_key("garden");
        store.set_item(&key, "{ not json").await.unwrap();

        let result: Option<TestPayload> = cache.get("garden").await;
        assert!(result.is_none());
        assert!(store.get_item(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_evicted_on_read() {
        let (cache, store) = create_test_cache();
        let key = CacheManager::cache_key("office");
        // Valid JSON, but `data` does not match TestPayload
        store
            .set_item(
                &key,
                r#"{"data":"just a string","timestamp":1,"categoryId":"office"}"#,
            )
            .await
            .unwrap();

        let result: Option<TestPayload> = cache.get("office").await;
        assert!(result.is_none());
        assert!(store.get_item(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wire_format_fields() {
        let (cache, store) = create_test_cache();

        cache.set("music", &payload("wire", 9)).await;

        let raw = store
            .get_item(&CacheManager::cache_key("music"))
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("data").is_some());
        assert!(value.get("timestamp").is_some());
        assert_eq!(value["categoryId"], "music");
    }

    #[tokio::test]
    async fn test_clear_removes_single_entry() {
        let (cache, _store) = create_test_cache();

        cache.set("books", &payload("a", 1)).await;
        cache.set("movies", &payload("b", 2)).await;

        cache.clear("books").await;

        assert!(cache.get::<TestPayload>("books").await.is_none());
        assert!(cache.get::<TestPayload>("movies").await.is_some());
    }

    #[tokio::test]
    async fn test_clear_all_leaves_foreign_keys_untouched() {
        let (cache, store) = create_test_cache();

        cache.set("books", &payload("a", 1)).await;
        cache.set("movies", &payload("b", 2)).await;
        store.set_item("theme_preference", "dark").await.unwrap();

        cache.clear_all().await;

        let keys = store.get_all_keys().await.unwrap();
        assert_eq!(keys, vec!["theme_preference".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_expired_removes_only_expired_entries() {
        let (cache, store) = create_test_cache();

        insert_aged(&store, "old_one", &payload("a", 1), 25).await;
        insert_aged(&store, "old_two", &payload("b", 2), 48).await;
        insert_aged(&store, "fresh", &payload("c", 3), 1).await;

        let removed = cache.cleanup_expired().await;
        assert_eq!(removed, 2);

        assert!(cache.get::<TestPayload>("fresh").await.is_some());
        let key = CacheManager::cache_key("old_one");
        assert!(store.get_item(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_is_idempotent() {
        let (cache, store) = create_test_cache();
        insert_aged(&store, "old", &payload("a", 1), 30).await;

        assert_eq!(cache.cleanup_expired().await, 1);
        assert_eq!(cache.cleanup_expired().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired_removes_undecodable_records() {
        let (cache, store) = create_test_cache();
        let key = CacheManager::cache_key("broken");
        store.set_item(&key, "not json at all").await.unwrap();

        assert_eq!(cache.cleanup_expired().await, 1);
        assert!(store.get_item(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_ignores_foreign_keys() {
        let (cache, store) = create_test_cache();
        store.set_item("unrelated", "not json").await.unwrap();

        assert_eq!(cache.cleanup_expired().await, 0);
        assert!(store.get_item("unrelated").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_info_reports_expired_entries_without_evicting() {
        let (cache, store) = create_test_cache();
        insert_aged(&store, "aged", &payload("a", 1), 30).await;

        let info = cache.get_info().await;
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].category_id, "aged");
        assert!(info[0].age >= Duration::hours(30));
        assert!(info[0].size_bytes > 0);

        // Inspection must not have removed the record
        let key = CacheManager::cache_key("aged");
        assert!(store.get_item(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_info_size_matches_serialized_record() {
        let (cache, store) = create_test_cache();

        cache.set("sized", &payload("abc", 1)).await;

        let raw = store
            .get_item(&CacheManager::cache_key("sized"))
            .await
            .unwrap()
            .unwrap();
        let info = cache.get_info().await;
        assert_eq!(info[0].size_bytes, raw.len());
    }

    #[tokio::test]
    async fn test_get_stale_returns_expired_record_within_bound() {
        let (cache, store) = create_test_cache();
        insert_aged(&store, "stale", &payload("old", 5), 48).await;

        // Normal read would evict it; the stale read serves it
        let result: Option<TestPayload> = cache.get_stale("stale").await;
        assert_eq!(result, Some(payload("old", 5)));
    }

    #[tokio::test]
    async fn test_get_stale_refuses_records_past_staleness_bound() {
        let (cache, store) = create_test_cache();
        insert_aged(&store, "ancient", &payload("too old", 5), 8 * 24).await;

        let result: Option<TestPayload> = cache.get_stale("ancient").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_stale_does_not_evict() {
        let (cache, store) = create_test_cache();
        insert_aged(&store, "stale", &payload("old", 5), 48).await;

        let _: Option<TestPayload> = cache.get_stale("stale").await;

        let key = CacheManager::cache_key("stale");
        assert!(store.get_item(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_stale_returns_fresh_record_too() {
        let (cache, _store) = create_test_cache();
        cache.set("fresh", &payload("now", 1)).await;

        let result: Option<TestPayload> = cache.get_stale("fresh").await;
        assert_eq!(result, Some(payload("now", 1)));
    }
}
