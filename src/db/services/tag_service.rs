use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::collections::BTreeSet;

use crate::context::UserContext;
use crate::db::entities::prelude::{ItemTagColumn, ItemTagEntity, ItemTagRow};
use crate::db::error::ItemServiceError;
use crate::db::models::Tag;
use crate::db::services::saved_item_service::parse_item_id;
use crate::db::storage::StorageContext;
use crate::db::transform::tags_from_rows;

/// Trims a tag name, rejecting blanks.
pub fn normalize_tag_name(name: &str) -> Result<String, ItemServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ItemServiceError::Validation("Tag names must not be blank".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Normalizes and de-duplicates tag names, keeping first-seen order.
pub fn normalize_tag_names(names: &[String]) -> Result<Vec<String>, ItemServiceError> {
    let mut seen = BTreeSet::new();
    let mut normalized = Vec::with_capacity(names.len());
    for name in names {
        let name = normalize_tag_name(name)?;
        if seen.insert(name.clone()) {
            normalized.push(name);
        }
    }
    Ok(normalized)
}

/// Read-only access to a user's tags. Tags exist only through their
/// associations, so every lookup is a query on `item_tags`.
#[derive(Clone, Debug)]
pub struct TagDataService {
    user: UserContext,
    storage: StorageContext,
}

impl TagDataService {
    pub fn new(user: UserContext, storage: StorageContext) -> Self {
        Self { user, storage }
    }

    /// Tags on one saved item, ordered by name. Each tag lists every saved
    /// item of the user that carries it.
    pub async fn get_tags_by_user_item(
        &self,
        saved_item_id: &str,
    ) -> Result<Vec<Tag>, ItemServiceError> {
        let Some(item_id) = parse_item_id(saved_item_id) else {
            return Ok(Vec::new());
        };
        let names = self.tag_names_for_item(item_id).await?;
        self.get_tags_by_name(&names).await
    }

    pub async fn get_tag_by_name(&self, name: &str) -> Result<Tag, ItemServiceError> {
        let rows = ItemTagEntity::find()
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::Tag.eq(name))
            .all(self.storage.conn())
            .await?;
        tags_from_rows(&rows)
            .into_iter()
            .next()
            .ok_or_else(|| ItemServiceError::tag_not_found(name))
    }

    /// Tags matching any of `names`, de-duplicated. Unknown names are skipped.
    pub async fn get_tags_by_name(&self, names: &[String]) -> Result<Vec<Tag>, ItemServiceError> {
        let unique: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }
        let rows = ItemTagEntity::find()
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::Tag.is_in(unique))
            .all(self.storage.conn())
            .await?;
        Ok(tags_from_rows(&rows))
    }

    pub(crate) async fn tag_names_for_item(
        &self,
        item_id: i64,
    ) -> Result<Vec<String>, ItemServiceError> {
        let names = ItemTagEntity::find()
            .select_only()
            .column(ItemTagColumn::Tag)
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::ItemId.eq(item_id))
            .order_by_asc(ItemTagColumn::Tag)
            .into_tuple::<String>()
            .all(self.storage.conn())
            .await?;
        Ok(names)
    }

    pub(crate) async fn rows_for_tag(
        &self,
        name: &str,
    ) -> Result<Vec<ItemTagRow>, ItemServiceError> {
        let rows = ItemTagEntity::find()
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::Tag.eq(name))
            .order_by_asc(ItemTagColumn::ItemId)
            .all(self.storage.conn())
            .await?;
        Ok(rows)
    }
}
