use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::context::UserContext;
use crate::db::models::SavedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    AddItem,
    ArchiveItem,
    UnarchiveItem,
    FavoriteItem,
    UnfavoriteItem,
    DeleteItem,
    AddTags,
    ReplaceTags,
    RemoveTags,
    ClearTags,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::AddItem => "ADD_ITEM",
            EventKind::ArchiveItem => "ARCHIVE_ITEM",
            EventKind::UnarchiveItem => "UNARCHIVE_ITEM",
            EventKind::FavoriteItem => "FAVORITE_ITEM",
            EventKind::UnfavoriteItem => "UNFAVORITE_ITEM",
            EventKind::DeleteItem => "DELETE_ITEM",
            EventKind::AddTags => "ADD_TAGS",
            EventKind::ReplaceTags => "REPLACE_TAGS",
            EventKind::RemoveTags => "REMOVE_TAGS",
            EventKind::ClearTags => "CLEAR_TAGS",
        };
        f.write_str(s)
    }
}

/// One domain event describing a completed state change on a saved item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEvent {
    pub event_id: Uuid,
    pub kind: EventKind,
    pub saved_item: SavedItem,
    pub user: UserContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub emitted_at: DateTime<Utc>,
}

impl ItemEvent {
    pub fn new(
        kind: EventKind,
        saved_item: SavedItem,
        user: UserContext,
        tags: Option<Vec<String>>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            saved_item,
            user,
            tags,
            emitted_at: Utc::now(),
        }
    }
}
