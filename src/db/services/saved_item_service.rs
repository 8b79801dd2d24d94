use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::BTreeSet;
use tracing::debug;

use crate::context::UserContext;
use crate::db::entities::prelude::{SavedItemColumn, SavedItemEntity, SavedItemRow};
use crate::db::error::ItemServiceError;
use crate::db::models::SavedItem;
use crate::db::storage::StorageContext;
use crate::db::transform::{saved_item_from_row, saved_items_from_rows};

/// Parses an external saved-item id. Ids are positive integers encoded as strings.
pub fn parse_item_id(id: &str) -> Option<i64> {
    id.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// Splits external ids into unique parsed ids (in first-seen order) and the
/// ids that could never match a row.
pub fn partition_item_ids(ids: &[String]) -> (Vec<i64>, Vec<String>) {
    let mut seen = BTreeSet::new();
    let mut parsed = Vec::new();
    let mut unparseable = Vec::new();
    for id in ids {
        match parse_item_id(id) {
            Some(item_id) => {
                if seen.insert(item_id) {
                    parsed.push(item_id);
                }
            }
            None => {
                if !unparseable.contains(id) {
                    unparseable.push(id.clone());
                }
            }
        }
    }
    (parsed, unparseable)
}

/// Read-only access to a user's saved items.
///
/// Built over whichever [`StorageContext`] the caller holds; mutations pass
/// their primary context so reads observe their own writes.
#[derive(Clone, Debug)]
pub struct SavedItemDataService {
    user: UserContext,
    storage: StorageContext,
}

impl SavedItemDataService {
    pub fn new(user: UserContext, storage: StorageContext) -> Self {
        Self { user, storage }
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    /// Fetches one saved item, failing with `NotFound` when it does not
    /// exist or belongs to another user.
    pub async fn get_by_id(&self, id: &str) -> Result<SavedItem, ItemServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ItemServiceError::saved_item_not_found(id))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<SavedItem>, ItemServiceError> {
        let Some(item_id) = parse_item_id(id) else {
            return Ok(None);
        };
        let row = self.find_row(item_id).await?;
        row.as_ref().map(saved_item_from_row).transpose()
    }

    /// Fetches every listed item owned by the user in one query. Ids that do
    /// not match are simply absent from the result.
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<SavedItem>, ItemServiceError> {
        let (item_ids, _) = partition_item_ids(ids);
        let rows = self.find_rows(&item_ids).await?;
        debug!(
            user_id = self.user.user_id,
            requested = ids.len(),
            found = rows.len(),
            "Fetched saved items by id."
        );
        saved_items_from_rows(&rows)
    }

    pub(crate) async fn find_row(
        &self,
        item_id: i64,
    ) -> Result<Option<SavedItemRow>, ItemServiceError> {
        let row = SavedItemEntity::find_by_id((self.user.user_id, item_id))
            .one(self.storage.conn())
            .await?;
        Ok(row)
    }

    pub(crate) async fn find_rows(
        &self,
        item_ids: &[i64],
    ) -> Result<Vec<SavedItemRow>, ItemServiceError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = SavedItemEntity::find()
            .filter(SavedItemColumn::UserId.eq(self.user.user_id))
            .filter(SavedItemColumn::ItemId.is_in(item_ids.iter().copied()))
            .order_by_asc(SavedItemColumn::ItemId)
            .all(self.storage.conn())
            .await?;
        Ok(rows)
    }
}
