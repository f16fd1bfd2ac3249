//! SQLite-backed key/value store.

use super::KeyValueStore;
use crate::config::StorageConfig;
use crate::error::{Result, ShowcaseError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Durable [`KeyValueStore`] over a single `kv` table.
///
/// Thread-safe via an internal mutex on the connection. Clones share the same
/// connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store at the specified database path.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ShowcaseError::Io {
                message: format!("Failed to create storage directory: {}", e),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| ShowcaseError::Database {
            message: format!("Failed to open storage database: {}", e),
            source: Some(e),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| ShowcaseError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        debug!("Opened key/value store at {}", db_path.display());
        Self::from_connection(conn)
    }

    /// Open the store at the platform's local data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Non-persistent store, mostly for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Default database location: `<data_local_dir>/showcase/showcase-storage.sqlite3`.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::data_local_dir().ok_or_else(|| ShowcaseError::Config {
            message: "No local data directory available on this platform".to_string(),
        })?;
        Ok(base
            .join(StorageConfig::APP_DIR_NAME)
            .join(StorageConfig::DATABASE_FILE_NAME))
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| ShowcaseError::Database {
            message: format!("Failed to initialize storage schema: {}", e),
            source: Some(e),
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| ShowcaseError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3
"#;

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| ShowcaseError::Database {
            message: format!("Failed to read key {}: {}", key, e),
            source: Some(e),
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(UPSERT_SQL, params![key, value, Utc::now().to_rfc3339()])
            .map_err(|e| ShowcaseError::Database {
                message: format!("Failed to write key {}: {}", key, e),
                source: Some(e),
            })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| ShowcaseError::Database {
                message: format!("Failed to remove key {}: {}", key, e),
                source: Some(e),
            })?;
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(UPSERT_SQL, params![key, value, now])
                .map_err(|e| ShowcaseError::Database {
                    message: format!("Failed to write key {}: {}", key, e),
                    source: Some(e),
                })?;
        }
        tx.commit()?;
        Ok(())
    }
}
