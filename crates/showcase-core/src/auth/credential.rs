//! Single-token credential store.
//!
//! The token is resident in memory once read or written; persistent storage is
//! only consulted when memory has nothing. Storage failures never escape: the
//! in-memory value stays authoritative for the live session.

use crate::config::StorageConfig;
use crate::storage::KeyValueStore;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resident {
    /// Storage has not been consulted yet.
    Unknown,
    Absent,
    Present(String),
}

/// Owner of the backend security token.
///
/// Callers read and write the token through this store and never keep their
/// own copy. Concurrent `set`/`clear` calls are last-write-wins.
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    resident: RwLock<Resident>,
}

impl CredentialStore {
    /// Create a store persisting under the default credential key.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(storage, StorageConfig::CREDENTIAL_KEY)
    }

    /// Create a store persisting under a custom key.
    pub fn with_key(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            resident: RwLock::new(Resident::Unknown),
        }
    }

    fn read_resident(&self) -> RwLockReadGuard<'_, Resident> {
        self.resident.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_resident(&self) -> RwLockWriteGuard<'_, Resident> {
        self.resident.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current token, loading it from storage on first access.
    pub fn get(&self) -> Option<String> {
        match &*self.read_resident() {
            Resident::Present(token) => return Some(token.clone()),
            Resident::Absent => return None,
            Resident::Unknown => {}
        }

        let loaded = match self.storage.get(&self.key) {
            Ok(value) => value.filter(|token| !token.is_empty()),
            Err(e) => {
                warn!("Failed to read credential from storage: {}", e);
                None
            }
        };

        let mut resident = self.write_resident();
        // A concurrent set/clear wins over what we just loaded.
        if *resident == Resident::Unknown {
            *resident = match loaded {
                Some(token) => Resident::Present(token),
                None => Resident::Absent,
            };
        }
        match &*resident {
            Resident::Present(token) => Some(token.clone()),
            _ => None,
        }
    }

    /// Persist a new token. Later `get` calls return it without touching storage.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        if let Err(e) = self.storage.set(&self.key, &token) {
            warn!("Failed to persist credential: {}", e);
        }
        *self.write_resident() = Resident::Present(token);
        debug!("Credential updated");
    }

    /// Forget the token in memory and in storage.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(&self.key) {
            warn!("Failed to remove persisted credential: {}", e);
        }
        *self.write_resident() = Resident::Absent;
        debug!("Credential cleared");
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token itself.
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
