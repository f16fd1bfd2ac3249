//! Read-through TTL cache with stale fallback.
//!
//! Lookup order:
//! 1. In-memory bounded cache (instant)
//! 2. Persistent key/value storage (hydrates memory on hit)
//! 3. Origin fetch, only when the entry is missing or stale
//!
//! When the origin fetch fails and any entry exists, expired or not, the old
//! value is served and the failure is logged as a warning. Only a key that has
//! never been cached surfaces the error.

use super::types::{CacheEntry, CacheSource, CacheStatus, Cached};
use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::storage::KeyValueStore;
use mini_moka::sync::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Keyed cache over an injected [`KeyValueStore`].
///
/// Persistent keys are `<namespace>_<key>` for the JSON payload and
/// `<namespace>_<key>_ts` for the epoch-millisecond timestamp, with `%` and
/// `_` in `key` percent-escaped so no key's payload entry can collide with
/// another key's timestamp entry.
pub struct TtlCache<V> {
    namespace: String,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    memory: Cache<String, CacheEntry<V>>,
    /// Serializes writes so memory and storage change together.
    write_lock: Mutex<()>,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        namespace: impl Into<String>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            storage,
            clock,
            memory: Cache::builder()
                .max_capacity(CacheConfig::MEMORY_CAPACITY)
                .build(),
            write_lock: Mutex::new(()),
        }
    }

    /// Return the cached value for `key`, fetching it if missing or stale.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F, ttl: Duration) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        self.get_or_fetch_detailed(key, fetch, ttl)
            .await
            .map(|cached| cached.value)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), also reporting where the
    /// value came from.
    pub async fn get_or_fetch_detailed<F, Fut>(
        &self,
        key: &str,
        fetch: F,
        ttl: Duration,
    ) -> Result<Cached<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let now = self.clock.now_millis();
        if let Some(entry) = self.lookup(key) {
            if entry.is_fresh(now, ttl) {
                debug!("Cache hit for {}/{}", self.namespace, key);
                return Ok(Cached {
                    value: entry.value,
                    source: CacheSource::Fresh,
                    stored_at: entry.stored_at,
                });
            }
            debug!("Cache entry for {}/{} is stale, refreshing", self.namespace, key);
        }

        match fetch().await {
            Ok(value) => {
                let stored_at = self.store(key, value.clone());
                Ok(Cached {
                    value,
                    source: CacheSource::Fetched,
                    stored_at,
                })
            }
            // Re-read: a concurrent refresh may have landed while we awaited.
            Err(e) => match self.lookup(key) {
                Some(entry) => {
                    warn!(
                        "Refresh of {}/{} failed, serving stale value: {}",
                        self.namespace, key, e
                    );
                    Ok(Cached {
                        value: entry.value,
                        source: CacheSource::Stale,
                        stored_at: entry.stored_at,
                    })
                }
                None => Err(e),
            },
        }
    }

    /// Current entry for `key`, fresh or not, without fetching.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<V>> {
        self.lookup(key)
    }

    /// Freshness report for `key` under `ttl`.
    pub fn status(&self, key: &str, ttl: Duration) -> CacheStatus {
        let now = self.clock.now_millis();
        match self.lookup(key) {
            Some(entry) => CacheStatus {
                has_cache: true,
                is_fresh: entry.is_fresh(now, ttl),
                age_millis: Some(entry.age_millis(now)),
                stored_at: Some(entry.stored_at),
            },
            None => CacheStatus::default(),
        }
    }

    /// Remove `key` from memory and storage.
    pub fn invalidate(&self, key: &str) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (payload_key, ts_key) = self.storage_keys(key);
        if let Err(e) = self
            .storage
            .remove(&payload_key)
            .and_then(|_| self.storage.remove(&ts_key))
        {
            warn!("Failed to remove {}/{} from storage: {}", self.namespace, key, e);
        }
        self.memory.invalidate(&key.to_string());
    }

    // Internal methods

    fn storage_keys(&self, key: &str) -> (String, String) {
        let payload_key = format!("{}_{}", self.namespace, escape_key(key));
        let ts_key = format!("{}{}", payload_key, CacheConfig::TIMESTAMP_SUFFIX);
        (payload_key, ts_key)
    }

    fn lookup(&self, key: &str) -> Option<CacheEntry<V>> {
        if let Some(entry) = self.memory.get(&key.to_string()) {
            return Some(entry);
        }
        // Hydrate under the write lock so a concurrent store cannot be
        // overwritten by the older persisted copy.
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.lookup_locked(key)
    }

    /// Caller must hold `write_lock`.
    fn lookup_locked(&self, key: &str) -> Option<CacheEntry<V>> {
        if let Some(entry) = self.memory.get(&key.to_string()) {
            return Some(entry);
        }
        let entry = self.load_persisted(key)?;
        self.memory.insert(key.to_string(), entry.clone());
        Some(entry)
    }

    fn load_persisted(&self, key: &str) -> Option<CacheEntry<V>> {
        let (payload_key, ts_key) = self.storage_keys(key);

        let payload = match self.storage.get(&payload_key) {
            Ok(payload) => payload?,
            Err(e) => {
                warn!("Failed to read {} from storage: {}", payload_key, e);
                return None;
            }
        };
        let stored_at = match self.storage.get(&ts_key) {
            Ok(Some(ts)) => match ts.parse::<i64>() {
                Ok(ts) => ts,
                Err(_) => {
                    warn!("Ignoring {}: unparseable timestamp {:?}", payload_key, ts);
                    return None;
                }
            },
            Ok(None) => {
                warn!("Ignoring {}: timestamp missing", payload_key);
                return None;
            }
            Err(e) => {
                warn!("Failed to read {} from storage: {}", ts_key, e);
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Some(CacheEntry { value, stored_at }),
            Err(e) => {
                warn!("Ignoring malformed cached payload {}: {}", payload_key, e);
                None
            }
        }
    }

    /// Persist then publish to memory. Returns the timestamp recorded.
    ///
    /// If persisting fails, memory is left untouched so a reload and the live
    /// session keep agreeing.
    fn store(&self, key: &str, value: V) -> i64 {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now_millis();
        let stored_at = match self.lookup_locked(key) {
            Some(existing) => now.max(existing.stored_at),
            None => now,
        };

        let payload = match serde_json::to_string(&value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Not caching {}/{}: {}", self.namespace, key, e);
                return stored_at;
            }
        };

        let (payload_key, ts_key) = self.storage_keys(key);
        let ts = stored_at.to_string();
        match self
            .storage
            .set_many(&[(payload_key.as_str(), payload.as_str()), (ts_key.as_str(), ts.as_str())])
        {
            Ok(()) => {
                self.memory
                    .insert(key.to_string(), CacheEntry { value, stored_at });
                debug!("Cached {}/{} at {}", self.namespace, key, stored_at);
            }
            Err(e) => warn!(
                "Failed to persist {}/{}, leaving previous entry in place: {}",
                self.namespace, key, e
            ),
        }
        stored_at
    }
}

/// Escape `%` and `_` so the escaped key never contains the `_` that starts
/// the timestamp suffix. Other characters are kept for readable storage keys.
fn escape_key(key: &str) -> String {
    key.replace('%', "%25").replace('_', "%5F")
}
