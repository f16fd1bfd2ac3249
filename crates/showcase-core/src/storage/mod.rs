//! Local key/value persistence.
//!
//! The credential store and the TTL cache never talk to a storage engine
//! directly; they receive a [`KeyValueStore`] by injection. Two backends ship:
//! - [`MemoryStore`]: process-local map, for tests and ephemeral sessions
//! - [`SqliteStore`]: durable single-table SQLite database

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;

/// String-keyed persistent storage.
///
/// Operations are synchronous to match rusqlite's API; implementations must be
/// cheap enough to call from async code between awaits.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Store several entries together.
    ///
    /// Backends that support transactions override this so either every entry
    /// lands or none does. The default writes in order and undoes the entries
    /// already written if a later one fails.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (index, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = self.set(key, value) {
                for (written, _) in &entries[..index] {
                    let _ = self.remove(written);
                }
                return Err(e);
            }
        }
        Ok(())
    }
}
