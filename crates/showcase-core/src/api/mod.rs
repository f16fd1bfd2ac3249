//! Facade that wires the data layer together.

mod builder;

pub use builder::DataLayerBuilder;

use crate::auth::CredentialStore;
use crate::cache::CacheStatus;
use crate::error::Result;
use crate::models::{ItemKind, RepositoryId, RepositoryInfo};
use crate::network::{HttpResponse, RepositoryMetadataClient, ResilientClient};
use crate::queue::FavoritesService;
use crate::scroll::{ScrollController, ScrollDriver, ScrollEngine, ScrollHandle, ScrollSurface};
use crate::storage::KeyValueStore;
use std::sync::Arc;

/// The assembled data layer: backend client, metadata cache and
/// favorites queue sharing one storage and one credential.
pub struct DataLayer {
    storage: Arc<dyn KeyValueStore>,
    credentials: Arc<CredentialStore>,
    client: Arc<ResilientClient>,
    metadata: RepositoryMetadataClient,
    favorites: FavoritesService,
}

impl DataLayer {
    pub fn builder(origin: impl Into<String>) -> DataLayerBuilder {
        DataLayerBuilder::new(origin)
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn client(&self) -> &Arc<ResilientClient> {
        &self.client
    }

    pub fn metadata(&self) -> &RepositoryMetadataClient {
        &self.metadata
    }

    pub fn favorites(&self) -> &FavoritesService {
        &self.favorites
    }

    /// GET a backend path with credential rotation.
    pub async fn get(&self, path: &str) -> Result<HttpResponse> {
        self.client.get(path).await
    }

    /// Fetch a token right after login.
    pub async fn login(&self) -> Result<()> {
        self.client.refresh_token().await.map(|_| ())
    }

    pub fn logout(&self) {
        self.client.logout();
    }

    /// Repository metadata for an `owner/name` string.
    pub async fn repository_info(&self, repo: &str) -> Result<RepositoryInfo> {
        let repo: RepositoryId = repo.parse()?;
        self.metadata.repository_info(&repo).await
    }

    pub fn repository_cache_status(&self, repo: &str) -> Result<CacheStatus> {
        let repo: RepositoryId = repo.parse()?;
        Ok(self.metadata.cache_status(&repo))
    }

    pub fn toggle_favorite(
        &self,
        kind: ItemKind,
        item_id: impl Into<String>,
        favorite: bool,
    ) -> Result<()> {
        self.favorites.toggle(kind, item_id, favorite)
    }

    /// Start auto-scrolling `surface` with the default speed and frame rate.
    /// Fails outside a tokio runtime.
    pub fn auto_scroll(&self, surface: Arc<dyn ScrollSurface>) -> Result<ScrollHandle> {
        let controller = Arc::new(ScrollController::new(ScrollEngine::default(), surface));
        ScrollDriver::spawn_default(controller)
    }

    /// Drop queued favorite changes. In-flight requests still complete.
    pub fn shutdown(&self) {
        self.favorites.shutdown();
    }
}
