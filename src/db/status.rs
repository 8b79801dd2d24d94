//! Saved-item lifecycle states and the transition rules that gate every
//! status or favorite change.
//!
//! `SavedItemStatus` carries two representations: the small-integer code
//! stored in the `list.status` column and the upper-case string used at the
//! external boundary (via serde).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SavedItemStatus {
    Unread,
    Archived,
    Deleted,
    Hidden,
}

impl SavedItemStatus {
    /// Numeric code persisted in storage.
    pub const fn code(self) -> i16 {
        match self {
            SavedItemStatus::Unread => 0,
            SavedItemStatus::Archived => 1,
            SavedItemStatus::Deleted => 2,
            SavedItemStatus::Hidden => 3,
        }
    }

    /// Maps a storage code back to a status. Unknown codes yield `None`;
    /// callers must treat that as corrupt data rather than pick a default.
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(SavedItemStatus::Unread),
            1 => Some(SavedItemStatus::Archived),
            2 => Some(SavedItemStatus::Deleted),
            3 => Some(SavedItemStatus::Hidden),
            _ => None,
        }
    }
}

impl fmt::Display for SavedItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SavedItemStatus::Unread => "UNREAD",
            SavedItemStatus::Archived => "ARCHIVED",
            SavedItemStatus::Deleted => "DELETED",
            SavedItemStatus::Hidden => "HIDDEN",
        };
        f.write_str(s)
    }
}

/// Timestamp column a transition writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampedField {
    ArchivedAt,
    FavoritedAt,
    DeletedAt,
}

/// What a transition does to the timestamp it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampRule {
    /// Overwrite with the operation timestamp.
    Set(StampedField),
    /// Overwrite only when the flag flips from false to true.
    SetIfUnset(StampedField),
    /// Reset to absent.
    Clear(StampedField),
}

/// A requested bulk transition on saved items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTransition {
    Archive,
    Unarchive,
    Favorite,
    Unfavorite,
    Delete,
}

/// Resulting column values of a transition. `None` leaves the field as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub status: Option<SavedItemStatus>,
    pub is_favorite: Option<bool>,
    pub stamp: StampRule,
}

impl StatusTransition {
    pub const fn outcome(self) -> TransitionOutcome {
        match self {
            StatusTransition::Archive => TransitionOutcome {
                status: Some(SavedItemStatus::Archived),
                is_favorite: None,
                stamp: StampRule::Set(StampedField::ArchivedAt),
            },
            StatusTransition::Unarchive => TransitionOutcome {
                status: Some(SavedItemStatus::Unread),
                is_favorite: None,
                stamp: StampRule::Clear(StampedField::ArchivedAt),
            },
            StatusTransition::Favorite => TransitionOutcome {
                status: None,
                is_favorite: Some(true),
                stamp: StampRule::SetIfUnset(StampedField::FavoritedAt),
            },
            StatusTransition::Unfavorite => TransitionOutcome {
                status: None,
                is_favorite: Some(false),
                stamp: StampRule::Clear(StampedField::FavoritedAt),
            },
            StatusTransition::Delete => TransitionOutcome {
                status: Some(SavedItemStatus::Deleted),
                is_favorite: None,
                stamp: StampRule::Set(StampedField::DeletedAt),
            },
        }
    }

    pub const fn event_kind(self) -> EventKind {
        match self {
            StatusTransition::Archive => EventKind::ArchiveItem,
            StatusTransition::Unarchive => EventKind::UnarchiveItem,
            StatusTransition::Favorite => EventKind::FavoriteItem,
            StatusTransition::Unfavorite => EventKind::UnfavoriteItem,
            StatusTransition::Delete => EventKind::DeleteItem,
        }
    }

    /// Whether an item in the given post-write state reflects this transition.
    /// Used to confirm the write took effect before an event goes out.
    pub fn is_reflected_by(self, status: SavedItemStatus, is_favorite: bool) -> bool {
        let outcome = self.outcome();
        outcome.status.is_none_or(|s| s == status)
            && outcome.is_favorite.is_none_or(|f| f == is_favorite)
    }
}

impl fmt::Display for StatusTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusTransition::Archive => "archive",
            StatusTransition::Unarchive => "unarchive",
            StatusTransition::Favorite => "favorite",
            StatusTransition::Unfavorite => "unfavorite",
            StatusTransition::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        for status in [
            SavedItemStatus::Unread,
            SavedItemStatus::Archived,
            SavedItemStatus::Deleted,
            SavedItemStatus::Hidden,
        ] {
            assert_eq!(SavedItemStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(SavedItemStatus::from_code(4), None);
        assert_eq!(SavedItemStatus::from_code(-1), None);
    }

    #[test]
    fn status_serializes_as_upper_case_string() {
        let json = serde_json::to_string(&SavedItemStatus::Archived).unwrap();
        assert_eq!(json, "\"ARCHIVED\"");
        let parsed: SavedItemStatus = serde_json::from_str("\"UNREAD\"").unwrap();
        assert_eq!(parsed, SavedItemStatus::Unread);
    }

    #[test]
    fn favorite_only_stamps_when_unset() {
        let outcome = StatusTransition::Favorite.outcome();
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.is_favorite, Some(true));
        assert_eq!(outcome.stamp, StampRule::SetIfUnset(StampedField::FavoritedAt));
    }

    #[test]
    fn unarchive_clears_archived_at() {
        let outcome = StatusTransition::Unarchive.outcome();
        assert_eq!(outcome.status, Some(SavedItemStatus::Unread));
        assert_eq!(outcome.stamp, StampRule::Clear(StampedField::ArchivedAt));
    }

    #[test]
    fn reflected_state_checks_only_touched_fields() {
        assert!(StatusTransition::Archive.is_reflected_by(SavedItemStatus::Archived, true));
        assert!(!StatusTransition::Archive.is_reflected_by(SavedItemStatus::Unread, false));
        assert!(StatusTransition::Favorite.is_reflected_by(SavedItemStatus::Deleted, true));
        assert!(!StatusTransition::Unfavorite.is_reflected_by(SavedItemStatus::Unread, true));
    }
}
