//! Read-through caching with stale fallback.
//!
//! [`TtlCache`] is generic over the cached value; persistence goes through an
//! injected [`KeyValueStore`](crate::storage::KeyValueStore) so the same cache
//! works against SQLite, an in-memory map, or anything else.

mod ttl;
mod types;

pub use ttl::TtlCache;
pub use types::{CacheEntry, CacheSource, CacheStatus, Cached};
