//! Cache entry and status types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value and the epoch-millisecond time it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: i64,
}

impl<V> CacheEntry<V> {
    /// Fresh iff `now - stored_at < ttl`.
    pub fn is_fresh(&self, now_millis: i64, ttl: Duration) -> bool {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_millis.saturating_sub(self.stored_at) < ttl_millis
    }

    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.stored_at).max(0)
    }
}

/// Where a value returned by the cache came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Served from a fresh entry; no fetch happened.
    Fresh,
    /// Fetched from the origin just now.
    Fetched,
    /// The fetch failed and an older entry was served instead.
    Stale,
}

/// A value plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub source: CacheSource,
    pub stored_at: i64,
}

/// Freshness report for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub has_cache: bool,
    pub is_fresh: bool,
    pub age_millis: Option<i64>,
    pub stored_at: Option<i64>,
}
