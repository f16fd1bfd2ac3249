//! Builder for configuring DataLayer initialization.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::DataLayer;
use crate::auth::CredentialStore;
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, ClientOptions, QueueConfig};
use crate::error::Result;
use crate::network::{HttpTransport, ReqwestTransport, RepositoryMetadataClient, ResilientClient};
use crate::queue::FavoritesService;
use crate::storage::{KeyValueStore, SqliteStore};
use tracing::info;

/// Builder for configuring DataLayer initialization.
///
/// Every collaborator can be injected; anything left unset gets its
/// production default.
///
/// # Example
///
/// ```rust,ignore
/// use showcase_core::{DataLayer, MemoryStore};
/// use std::sync::Arc;
///
/// let data = DataLayer::builder("https://gallery.example.com")
///     .storage(Arc::new(MemoryStore::new()))
///     .build()
///     .await?;
/// ```
pub struct DataLayerBuilder {
    options: ClientOptions,
    storage: Option<Arc<dyn KeyValueStore>>,
    storage_path: Option<PathBuf>,
    backend_transport: Option<Arc<dyn HttpTransport>>,
    metadata_transport: Option<Arc<dyn HttpTransport>>,
    clock: Option<Arc<dyn Clock>>,
    settle_delay: Duration,
    repo_info_ttl: Duration,
}

impl DataLayerBuilder {
    /// Create a builder for the backend at `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_options(ClientOptions::for_origin(origin))
    }

    pub fn with_options(options: ClientOptions) -> Self {
        Self {
            options,
            storage: None,
            storage_path: None,
            backend_transport: None,
            metadata_transport: None,
            clock: None,
            settle_delay: QueueConfig::SETTLE_DELAY,
            repo_info_ttl: CacheConfig::REPO_INFO_TTL,
        }
    }

    /// Use an existing key/value store.
    ///
    /// Default: SQLite database in the platform data directory.
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Open (or create) a SQLite store at `path`. Ignored if
    /// [`storage`](Self::storage) is set.
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Transport for backend calls. Default: reqwest with a cookie store.
    pub fn backend_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.backend_transport = Some(transport);
        self
    }

    /// Transport for third-party metadata calls. Default: a separate reqwest
    /// client, so backend cookies are never sent to third parties.
    pub fn metadata_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.metadata_transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Delay before each queued favorite change is sent.
    ///
    /// Default: 300 ms
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Freshness window for repository metadata.
    ///
    /// Default: 1 hour
    pub fn repo_info_ttl(mut self, ttl: Duration) -> Self {
        self.repo_info_ttl = ttl;
        self
    }

    /// Build the DataLayer. Must be called inside a tokio runtime.
    pub async fn build(self) -> Result<DataLayer> {
        let storage: Arc<dyn KeyValueStore> = match (self.storage, self.storage_path) {
            (Some(storage), _) => storage,
            (None, Some(path)) => Arc::new(SqliteStore::open(path)?),
            (None, None) => Arc::new(SqliteStore::open_default()?),
        };

        let backend_transport: Arc<dyn HttpTransport> = match self.backend_transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.options)?),
        };
        let metadata_transport: Arc<dyn HttpTransport> = match self.metadata_transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.options)?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let credentials = Arc::new(CredentialStore::new(Arc::clone(&storage)));
        let client = Arc::new(ResilientClient::new(
            backend_transport,
            Arc::clone(&credentials),
            &self.options,
        )?);
        let metadata = RepositoryMetadataClient::with_options(
            metadata_transport,
            Arc::clone(&storage),
            clock,
            self.options.metadata_origin.clone(),
            self.repo_info_ttl,
        );
        let favorites = FavoritesService::with_settle_delay(Arc::clone(&client), self.settle_delay)?;

        info!("Data layer ready for {}", self.options.origin);
        Ok(DataLayer {
            storage,
            credentials,
            client,
            metadata,
            favorites,
        })
    }
}
