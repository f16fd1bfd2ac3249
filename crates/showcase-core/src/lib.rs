//! Showcase Core - resilient client-side data layer for the theme and plugin
//! gallery.
//!
//! The crate talks to the gallery backend and to the GitHub API on behalf of
//! the UI. It keeps the backend credential valid, caches third-party
//! repository metadata with stale fallback, serializes favorite changes, and
//! drives the auto-scrolling showcase strip.
//!
//! # Example
//!
//! ```rust,ignore
//! use showcase_core::{DataLayer, ItemKind};
//!
//! #[tokio::main]
//! async fn main() -> showcase_core::Result<()> {
//!     let data = DataLayer::builder("https://gallery.example.com").build().await?;
//!
//!     let info = data.repository_info("acme/nord-theme").await?;
//!     println!("{} stars, {} contributors", info.stars, info.contributors.len());
//!
//!     data.toggle_favorite(ItemKind::Theme, "nord", true)?;
//!     data.favorites().wait_idle().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod queue;
pub mod scroll;
pub mod storage;

mod api;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use api::{DataLayer, DataLayerBuilder};
pub use auth::CredentialStore;
pub use cache::{CacheEntry, CacheSource, CacheStatus, Cached, TtlCache};
pub use cancel::CancellationToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientOptions;
pub use error::{Result, ShowcaseError};
pub use models::{Contributor, FavoriteAction, ItemKind, RepositoryId, RepositoryInfo};
pub use network::{
    HttpRequest, HttpResponse, HttpTransport, RateLimitState, RepositoryMetadataClient,
    ReqwestTransport, ResilientClient,
};
pub use queue::{ActionQueue, ActionQueueBuilder, FavoritesService};
pub use scroll::{
    PointerTarget, ScrollController, ScrollDriver, ScrollEngine, ScrollHandle, ScrollMode,
    ScrollSurface,
};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
