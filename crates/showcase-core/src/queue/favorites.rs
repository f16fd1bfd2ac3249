//! Favorite/unfavorite mutations applied through the action queue.
//!
//! Rapid toggles on the same item collapse: only the latest pending state of
//! an identical change is sent, and changes reach the backend one at a time in
//! the order the user made them.

use super::action_queue::ActionQueue;
use crate::error::Result;
use crate::models::{FavoriteAction, ItemKind};
use crate::network::{HttpRequest, ResilientClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Sends favorite changes to the backend.
pub struct FavoritesService {
    queue: ActionQueue<FavoriteAction>,
}

impl FavoritesService {
    /// Create a service with the default settle delay.
    pub fn new(client: Arc<ResilientClient>) -> Result<Self> {
        Self::with_settle_delay(client, crate::config::QueueConfig::SETTLE_DELAY)
    }

    pub fn with_settle_delay(client: Arc<ResilientClient>, settle_delay: Duration) -> Result<Self> {
        let queue = ActionQueue::builder(move |action: FavoriteAction| {
            let client = Arc::clone(&client);
            async move { apply(&client, &action).await }
        })
        .settle_delay(settle_delay)
        .build()?;
        Ok(Self { queue })
    }

    /// Wrap an already built queue, e.g. one with a failure observer.
    pub fn from_queue(queue: ActionQueue<FavoriteAction>) -> Self {
        Self { queue }
    }

    /// Queue a favorite (`true`) or unfavorite (`false`) for an item.
    pub fn toggle(&self, kind: ItemKind, item_id: impl Into<String>, favorite: bool) -> Result<()> {
        self.queue.enqueue(FavoriteAction::new(kind, item_id, favorite))
    }

    pub fn pending(&self) -> Vec<FavoriteAction> {
        self.queue.pending()
    }

    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}

/// Send one change. Non-2xx responses are failures.
pub async fn apply(client: &ResilientClient, action: &FavoriteAction) -> anyhow::Result<()> {
    let path = action.path();
    let request = if action.favorite {
        HttpRequest::post(path.as_str())
    } else {
        HttpRequest::delete(path.as_str())
    };
    let method = request.method.clone();

    let response = client.request(request).await?;
    if !response.is_success() {
        anyhow::bail!("{} {} returned {}", method, path, response.status);
    }

    info!(
        "{} {} {}",
        if action.favorite { "Favorited" } else { "Unfavorited" },
        action.kind.collection(),
        action.item_id
    );
    Ok(())
}
