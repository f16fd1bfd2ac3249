//! Serialized execution of user-triggered mutations.

mod action_queue;
mod favorites;

pub use action_queue::{ActionQueue, ActionQueueBuilder};
pub use favorites::{apply as apply_favorite, FavoritesService};
