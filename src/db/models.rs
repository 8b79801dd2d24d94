use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::status::SavedItemStatus;

/// Canonical saved item as exposed to callers.
/// Built from a `list` row by [`crate::db::transform::saved_item_from_row`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    pub id: String,
    pub user_id: i64,
    pub url: String,
    pub resolved_id: Option<String>,
    pub title: Option<String>,
    pub status: SavedItemStatus,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub favorited_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A user's tag with the saved items carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub saved_item_ids: Vec<String>,
}

impl Tag {
    pub fn new(name: String, mut saved_item_ids: Vec<String>) -> Self {
        // Numeric order; ids that do not parse sort last, by text.
        saved_item_ids.sort_by(|a, b| {
            let key = |id: &str| id.parse::<i64>().map_or((1, 0), |n| (0, n));
            key(a).cmp(&key(b)).then_with(|| a.cmp(b))
        });
        saved_item_ids.dedup();
        Self {
            id: encode_tag_id(&name),
            name,
            saved_item_ids,
        }
    }
}

/// Opaque tag identifier: hex encoding of the tag name.
pub fn encode_tag_id(name: &str) -> String {
    hex::encode(name.as_bytes())
}

/// Inverse of [`encode_tag_id`]. `None` for anything that is not valid hex of UTF-8.
pub fn decode_tag_id(id: &str) -> Option<String> {
    let bytes = hex::decode(id).ok()?;
    String::from_utf8(bytes).ok()
}

/// Outcome of a bulk status mutation: rows that exist were updated, the rest
/// are listed as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkUpdateResult {
    pub updated: Vec<SavedItem>,
    pub missing: Vec<String>,
}

/// Machine-readable kind carried by per-element errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
}

/// Per-identifier failure reported alongside successful updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNotFoundError {
    pub kind: ErrorKind,
    pub id: String,
    pub message: String,
    pub path: Vec<String>,
}

/// Response shape offered upward for bulk status operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMutationPayload {
    pub updated_entities: Vec<SavedItem>,
    pub errors: Vec<ItemNotFoundError>,
}

impl BulkUpdateResult {
    /// Converts into the upward payload, attributing every missing id to `path`.
    pub fn into_payload(self, path: &[&str]) -> BulkMutationPayload {
        let path: Vec<String> = path.iter().map(|p| p.to_string()).collect();
        let errors = self
            .missing
            .into_iter()
            .map(|id| ItemNotFoundError {
                kind: ErrorKind::NotFound,
                message: format!("Saved item with id {id} not found"),
                id,
                path: path.clone(),
            })
            .collect();
        BulkMutationPayload {
            updated_entities: self.updated,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_id_round_trips_through_hex() {
        let id = encode_tag_id("Rust");
        assert_eq!(id, "52757374");
        assert_eq!(decode_tag_id(&id).as_deref(), Some("Rust"));
        assert_eq!(decode_tag_id("zz"), None);
    }

    #[test]
    fn tag_sorts_and_dedups_item_ids() {
        let tag = Tag::new("news".into(), vec!["3".into(), "1".into(), "3".into()]);
        assert_eq!(tag.saved_item_ids, vec!["1".to_string(), "3".to_string()]);
        assert_eq!(tag.id, encode_tag_id("news"));
    }

    #[test]
    fn tag_item_ids_are_in_numeric_order() {
        let tag = Tag::new("news".into(), vec!["10".into(), "9".into(), "100".into()]);
        assert_eq!(tag.saved_item_ids, vec!["9", "10", "100"]);
    }

    #[test]
    fn payload_attributes_missing_ids_to_path() {
        let result = BulkUpdateResult {
            updated: vec![],
            missing: vec!["11".into()],
        };
        let payload = result.into_payload(&["saveArchive"]);
        assert_eq!(payload.errors.len(), 1);
        assert_eq!(payload.errors[0].id, "11");
        assert_eq!(payload.errors[0].kind, ErrorKind::NotFound);
        assert_eq!(payload.errors[0].path, vec!["saveArchive".to_string()]);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["errors"][0]["kind"], "NotFound");
        assert!(json["updatedEntities"].as_array().unwrap().is_empty());
    }
}
