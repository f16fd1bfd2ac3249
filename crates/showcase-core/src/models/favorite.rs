//! Favorite/unfavorite mutations.

use serde::{Deserialize, Serialize};

/// Kind of gallery item a user can favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Theme,
    Plugin,
}

impl ItemKind {
    /// Collection segment in backend paths.
    pub fn collection(&self) -> &'static str {
        match self {
            ItemKind::Theme => "themes",
            ItemKind::Plugin => "plugins",
        }
    }
}

/// One pending favorite change. Equality is structural over every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoriteAction {
    pub kind: ItemKind,
    pub item_id: String,
    pub favorite: bool,
}

impl FavoriteAction {
    pub fn new(kind: ItemKind, item_id: impl Into<String>, favorite: bool) -> Self {
        Self {
            kind,
            item_id: item_id.into(),
            favorite,
        }
    }

    /// Backend path the change is sent to.
    pub fn path(&self) -> String {
        format!(
            "/api/{}/{}/favorite",
            self.kind.collection(),
            urlencoding::encode(&self.item_id)
        )
    }
}
