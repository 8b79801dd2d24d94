//! Conversion of raw storage rows into canonical entities.
//!
//! Date columns use an all-zero sentinel for "unset". Anything at or before
//! the epoch is treated as that sentinel and never surfaces as a timestamp.
//! Archived/favorited/deleted timestamps are derived from status and
//! favorite flag so they can never contradict them.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::db::entities::prelude::{ItemTagRow, SavedItemRow};
use crate::db::error::ItemServiceError;
use crate::db::models::{SavedItem, Tag};
use crate::db::status::SavedItemStatus;

/// Value written to date columns that are logically unset.
pub const ZERO_DATE: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

pub fn is_zero_date(value: &DateTime<Utc>) -> bool {
    *value <= ZERO_DATE
}

/// Maps the zero sentinel to `None`.
pub fn normalize_date(value: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if is_zero_date(&value) { None } else { Some(value) }
}

fn favorite_flag(row: &SavedItemRow) -> Result<bool, ItemServiceError> {
    match row.favorite {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ItemServiceError::MalformedRow {
            item_id: row.item_id,
            reason: format!("favorite flag {other} is not 0 or 1"),
        }),
    }
}

pub fn saved_item_from_row(row: &SavedItemRow) -> Result<SavedItem, ItemServiceError> {
    let status =
        SavedItemStatus::from_code(row.status).ok_or_else(|| ItemServiceError::MalformedRow {
            item_id: row.item_id,
            reason: format!("unknown status code {}", row.status),
        })?;
    let is_favorite = favorite_flag(row)?;

    let created_at = normalize_date(row.time_added).ok_or_else(|| ItemServiceError::MalformedRow {
        item_id: row.item_id,
        reason: "time_added is unset".to_string(),
    })?;
    let updated_at = normalize_date(row.time_updated).unwrap_or(created_at);

    let archived_at = match status {
        SavedItemStatus::Archived => Some(normalize_date(row.time_read).unwrap_or(updated_at)),
        _ => None,
    };
    let favorited_at = if is_favorite {
        Some(normalize_date(row.time_favorited).unwrap_or(updated_at))
    } else {
        None
    };
    let deleted_at = match status {
        SavedItemStatus::Deleted => Some(updated_at),
        _ => None,
    };

    Ok(SavedItem {
        id: row.item_id.to_string(),
        user_id: row.user_id,
        url: row.given_url.clone(),
        resolved_id: row.resolved_id.filter(|id| *id > 0).map(|id| id.to_string()),
        title: row.title.clone(),
        status,
        is_favorite,
        is_archived: status == SavedItemStatus::Archived,
        created_at,
        updated_at,
        archived_at,
        favorited_at,
        deleted_at,
    })
}

pub fn saved_items_from_rows(rows: &[SavedItemRow]) -> Result<Vec<SavedItem>, ItemServiceError> {
    rows.iter().map(saved_item_from_row).collect()
}

/// Groups association rows into tags, ordered by tag name.
pub fn tags_from_rows(rows: &[ItemTagRow]) -> Vec<Tag> {
    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.tag.as_str())
            .or_default()
            .push(row.item_id.to_string());
    }
    grouped
        .into_iter()
        .map(|(name, item_ids)| Tag::new(name.to_string(), item_ids))
        .collect()
}
