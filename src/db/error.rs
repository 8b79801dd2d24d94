use sea_orm::DbErr;
use thiserror::Error;

/// Entity named in a not-found error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    SavedItem,
    Tag,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::SavedItem => f.write_str("Saved item"),
            EntityKind::Tag => f.write_str("Tag"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ItemServiceError {
    #[error("{kind} with id {id} not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Malformed row for item {item_id}: {reason}")]
    MalformedRow { item_id: i64, reason: String },
    #[error("Failed to save item with url {url}: {reason}")]
    UpsertFailure { url: String, reason: String },
    #[error("Mutation attempted through a read-only storage context")]
    ReadOnlyStorage,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ItemServiceError {
    pub fn saved_item_not_found(id: impl Into<String>) -> Self {
        ItemServiceError::NotFound {
            kind: EntityKind::SavedItem,
            id: id.into(),
        }
    }

    pub fn tag_not_found(name: impl Into<String>) -> Self {
        ItemServiceError::NotFound {
            kind: EntityKind::Tag,
            id: name.into(),
        }
    }
}
