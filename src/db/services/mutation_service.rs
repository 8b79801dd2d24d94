use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::context::UserContext;
use crate::db::entities::prelude::{
    ItemTagActiveModel, ItemTagColumn, ItemTagEntity, SavedItemColumn, SavedItemEntity,
};
use crate::db::error::ItemServiceError;
use crate::db::models::{BulkUpdateResult, SavedItem, Tag, decode_tag_id};
use crate::db::services::saved_item_service::{
    SavedItemDataService, parse_item_id, partition_item_ids,
};
use crate::db::services::tag_service::{TagDataService, normalize_tag_name, normalize_tag_names};
use crate::db::status::{SavedItemStatus, StampRule, StampedField, StatusTransition};
use crate::db::storage::StorageContext;
use crate::db::transform::{ZERO_DATE, saved_items_from_rows};
use crate::events::{EventKind, ItemsEventEmitter};

fn stamped_column(field: StampedField) -> Option<SavedItemColumn> {
    match field {
        StampedField::ArchivedAt => Some(SavedItemColumn::TimeRead),
        StampedField::FavoritedAt => Some(SavedItemColumn::TimeFavorited),
        // Deleted-at is read from time_updated, which every transition stamps.
        StampedField::DeletedAt => None,
    }
}

fn already_set(field: StampedField) -> SimpleExpr {
    match field {
        StampedField::ArchivedAt => SavedItemColumn::Status.eq(SavedItemStatus::Archived.code()),
        StampedField::FavoritedAt => SavedItemColumn::Favorite.eq(1),
        StampedField::DeletedAt => SavedItemColumn::Status.eq(SavedItemStatus::Deleted.code()),
    }
}

/// Writes to a user's saved items and their tag associations.
///
/// Every write goes to the primary connection, and every read that follows
/// a write reuses it. Bulk status changes are one conditional statement over
/// the whole id set followed by one read-back; ids without a row are
/// reported as missing instead of failing the batch.
#[derive(Clone)]
pub struct SavedItemMutationService {
    user: UserContext,
    storage: StorageContext,
    items: SavedItemDataService,
    tags: TagDataService,
    emitter: ItemsEventEmitter,
}

impl SavedItemMutationService {
    pub fn new(
        user: UserContext,
        storage: StorageContext,
        emitter: ItemsEventEmitter,
    ) -> Result<Self, ItemServiceError> {
        if !storage.is_writable() {
            return Err(ItemServiceError::ReadOnlyStorage);
        }
        Ok(Self {
            items: SavedItemDataService::new(user.clone(), storage.clone()),
            tags: TagDataService::new(user.clone(), storage.clone()),
            user,
            storage,
            emitter,
        })
    }

    /// Read service bound to the same primary connection.
    pub fn reader(&self) -> &SavedItemDataService {
        &self.items
    }

    pub async fn archive(
        &self,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<BulkUpdateResult, ItemServiceError> {
        self.apply(StatusTransition::Archive, ids, at).await
    }

    pub async fn unarchive(
        &self,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<BulkUpdateResult, ItemServiceError> {
        self.apply(StatusTransition::Unarchive, ids, at).await
    }

    pub async fn favorite(
        &self,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<BulkUpdateResult, ItemServiceError> {
        self.apply(StatusTransition::Favorite, ids, at).await
    }

    pub async fn unfavorite(
        &self,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<BulkUpdateResult, ItemServiceError> {
        self.apply(StatusTransition::Unfavorite, ids, at).await
    }

    /// Soft-deletes the items and drops their tag associations.
    pub async fn delete(
        &self,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<BulkUpdateResult, ItemServiceError> {
        self.apply(StatusTransition::Delete, ids, at).await
    }

    /// Applies one status transition to every listed item the user owns.
    pub async fn apply(
        &self,
        transition: StatusTransition,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<BulkUpdateResult, ItemServiceError> {
        let (item_ids, mut missing) = partition_item_ids(ids);
        if item_ids.is_empty() {
            return Ok(BulkUpdateResult {
                updated: Vec::new(),
                missing,
            });
        }

        let conn = self.storage.writer()?;
        let rows_affected = if transition == StatusTransition::Delete {
            let txn = conn.begin().await?;
            let affected = self.bulk_update(&txn, transition, &item_ids, at).await?;
            ItemTagEntity::delete_many()
                .filter(ItemTagColumn::UserId.eq(self.user.user_id))
                .filter(ItemTagColumn::ItemId.is_in(item_ids.iter().copied()))
                .exec(&txn)
                .await?;
            txn.commit().await?;
            affected
        } else {
            self.bulk_update(conn, transition, &item_ids, at).await?
        };

        let deleted = SavedItemStatus::Deleted.code();
        // Soft-deleted rows only answer to Delete; for anything else they count as missing.
        let rows: Vec<_> = self
            .items
            .find_rows(&item_ids)
            .await?
            .into_iter()
            .filter(|row| transition == StatusTransition::Delete || row.status != deleted)
            .collect();
        let found: BTreeSet<i64> = rows.iter().map(|row| row.item_id).collect();
        missing.extend(
            item_ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(|id| id.to_string()),
        );
        let updated = saved_items_from_rows(&rows)?;
        self.emit_reflected(transition, &updated);

        if !missing.is_empty() {
            warn!(
                user_id = self.user.user_id,
                transition = %transition,
                missing = missing.len(),
                "Bulk update referenced saved items that do not exist."
            );
        }
        info!(
            user_id = self.user.user_id,
            transition = %transition,
            rows_affected,
            updated = updated.len(),
            "Bulk saved item update completed."
        );

        Ok(BulkUpdateResult { updated, missing })
    }

    /// Emits the transition's event for every item whose read-back state
    /// reflects it. Returns how many events were handed to the emitter.
    fn emit_reflected(&self, transition: StatusTransition, items: &[SavedItem]) -> usize {
        let mut emitted = 0;
        for item in items {
            if transition.is_reflected_by(item.status, item.is_favorite) {
                self.emitter.emit(transition.event_kind(), item, &self.user, None);
                emitted += 1;
            } else {
                warn!(
                    user_id = self.user.user_id,
                    item_id = %item.id,
                    transition = %transition,
                    "Post-write state does not reflect the transition; skipping event."
                );
            }
        }
        emitted
    }

    async fn bulk_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        transition: StatusTransition,
        item_ids: &[i64],
        at: DateTime<Utc>,
    ) -> Result<u64, ItemServiceError> {
        let outcome = transition.outcome();
        let mut update = SavedItemEntity::update_many()
            .col_expr(SavedItemColumn::TimeUpdated, Expr::value(at));

        if let Some(status) = outcome.status {
            update = update.col_expr(SavedItemColumn::Status, Expr::value(status.code()));
        }
        if let Some(is_favorite) = outcome.is_favorite {
            update = update.col_expr(
                SavedItemColumn::Favorite,
                Expr::value(i16::from(is_favorite)),
            );
        }
        update = match outcome.stamp {
            StampRule::Set(field) => match stamped_column(field) {
                Some(column) => update.col_expr(column, Expr::value(at)),
                None => update,
            },
            // CASE sees the pre-update row, so an existing stamp is kept.
            StampRule::SetIfUnset(field) => match stamped_column(field) {
                Some(column) => update.col_expr(
                    column,
                    Expr::case(already_set(field), Expr::col(column))
                        .finally(Expr::value(at))
                        .into(),
                ),
                None => update,
            },
            StampRule::Clear(field) => match stamped_column(field) {
                Some(column) => update.col_expr(column, Expr::value(ZERO_DATE)),
                None => update,
            },
        };

        if transition != StatusTransition::Delete {
            update = update.filter(SavedItemColumn::Status.ne(SavedItemStatus::Deleted.code()));
        }

        let result = update
            .filter(SavedItemColumn::UserId.eq(self.user.user_id))
            .filter(SavedItemColumn::ItemId.is_in(item_ids.iter().copied()))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn touch_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        item_ids: &[i64],
        at: DateTime<Utc>,
    ) -> Result<(), ItemServiceError> {
        if item_ids.is_empty() {
            return Ok(());
        }
        SavedItemEntity::update_many()
            .col_expr(SavedItemColumn::TimeUpdated, Expr::value(at))
            .filter(SavedItemColumn::UserId.eq(self.user.user_id))
            .filter(SavedItemColumn::ItemId.is_in(item_ids.iter().copied()))
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn insert_associations<C: ConnectionTrait>(
        &self,
        conn: &C,
        item_id: i64,
        names: &[String],
        at: DateTime<Utc>,
    ) -> Result<(), ItemServiceError> {
        if names.is_empty() {
            return Ok(());
        }
        let models = names.iter().map(|name| ItemTagActiveModel {
            user_id: Set(self.user.user_id),
            item_id: Set(item_id),
            tag: Set(name.clone()),
            time_added: Set(at),
            time_updated: Set(at),
            api_id: Set(self.user.api_id.clone()),
        });
        ItemTagEntity::insert_many(models).exec_without_returning(conn).await?;
        Ok(())
    }

    async fn existing_item_id(&self, saved_item_id: &str) -> Result<i64, ItemServiceError> {
        let item_id = parse_item_id(saved_item_id)
            .ok_or_else(|| ItemServiceError::saved_item_not_found(saved_item_id))?;
        match self.items.find_row(item_id).await? {
            Some(_) => Ok(item_id),
            None => Err(ItemServiceError::saved_item_not_found(saved_item_id)),
        }
    }

    /// Replaces every tag on a saved item with the tags named by `tag_ids`.
    /// An empty list is rejected; clearing goes through [`Self::remove_all_tags`].
    pub async fn replace_tags(
        &self,
        saved_item_id: &str,
        tag_ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<SavedItem, ItemServiceError> {
        if tag_ids.is_empty() {
            return Err(ItemServiceError::Validation(
                "tagIds must not be empty; use the remove-tags operation to clear tags".to_string(),
            ));
        }
        let names = tag_ids
            .iter()
            .map(|id| {
                decode_tag_id(id)
                    .ok_or_else(|| ItemServiceError::Validation(format!("Invalid tag id: {id}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let names = normalize_tag_names(&names)?;

        let item_id = self.existing_item_id(saved_item_id).await?;

        let txn = self.storage.writer()?.begin().await?;
        ItemTagEntity::delete_many()
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::ItemId.eq(item_id))
            .exec(&txn)
            .await?;
        self.insert_associations(&txn, item_id, &names, at).await?;
        self.touch_items(&txn, &[item_id], at).await?;
        txn.commit().await?;

        let item = self.items.get_by_id(saved_item_id).await?;
        info!(
            user_id = self.user.user_id,
            item_id,
            tags = names.len(),
            "Replaced saved item tags."
        );
        self.emitter.emit(EventKind::ReplaceTags, &item, &self.user, Some(names));
        Ok(item)
    }

    /// Drops every tag association of a saved item. Tags left without any
    /// association cease to exist.
    pub async fn remove_all_tags(
        &self,
        saved_item_id: &str,
        at: DateTime<Utc>,
    ) -> Result<SavedItem, ItemServiceError> {
        let item_id = self.existing_item_id(saved_item_id).await?;
        // Names must be captured first; the rows are gone afterwards.
        let cleared = self.tags.tag_names_for_item(item_id).await?;

        let txn = self.storage.writer()?.begin().await?;
        ItemTagEntity::delete_many()
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::ItemId.eq(item_id))
            .exec(&txn)
            .await?;
        self.touch_items(&txn, &[item_id], at).await?;
        txn.commit().await?;

        let item = self.items.get_by_id(saved_item_id).await?;
        if !cleared.is_empty() {
            info!(
                user_id = self.user.user_id,
                item_id,
                tags = cleared.len(),
                "Cleared saved item tags."
            );
            self.emitter.emit(EventKind::ClearTags, &item, &self.user, Some(cleared));
        }
        Ok(item)
    }

    /// Adds tags to a saved item, keeping the ones it already has.
    pub async fn add_tags(
        &self,
        saved_item_id: &str,
        names: &[String],
        at: DateTime<Utc>,
    ) -> Result<SavedItem, ItemServiceError> {
        if names.is_empty() {
            return Err(ItemServiceError::Validation(
                "At least one tag name is required".to_string(),
            ));
        }
        let names = normalize_tag_names(names)?;
        let item_id = self.existing_item_id(saved_item_id).await?;

        let existing: BTreeSet<String> = self
            .tags
            .tag_names_for_item(item_id)
            .await?
            .into_iter()
            .collect();
        let added: Vec<String> = names
            .into_iter()
            .filter(|name| !existing.contains(name))
            .collect();
        if added.is_empty() {
            return self.items.get_by_id(saved_item_id).await;
        }

        let txn = self.storage.writer()?.begin().await?;
        self.insert_associations(&txn, item_id, &added, at).await?;
        self.touch_items(&txn, &[item_id], at).await?;
        txn.commit().await?;

        let item = self.items.get_by_id(saved_item_id).await?;
        self.emitter.emit(EventKind::AddTags, &item, &self.user, Some(added));
        Ok(item)
    }

    /// Removes the named tags from one saved item.
    pub async fn remove_tags(
        &self,
        saved_item_id: &str,
        names: &[String],
        at: DateTime<Utc>,
    ) -> Result<SavedItem, ItemServiceError> {
        if names.is_empty() {
            return Err(ItemServiceError::Validation(
                "At least one tag name is required".to_string(),
            ));
        }
        let names = normalize_tag_names(names)?;
        let item_id = self.existing_item_id(saved_item_id).await?;

        let existing: BTreeSet<String> = self
            .tags
            .tag_names_for_item(item_id)
            .await?
            .into_iter()
            .collect();
        let removed: Vec<String> = names
            .into_iter()
            .filter(|name| existing.contains(name))
            .collect();
        if removed.is_empty() {
            return self.items.get_by_id(saved_item_id).await;
        }

        let txn = self.storage.writer()?.begin().await?;
        ItemTagEntity::delete_many()
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::ItemId.eq(item_id))
            .filter(ItemTagColumn::Tag.is_in(removed.iter().map(String::as_str)))
            .exec(&txn)
            .await?;
        self.touch_items(&txn, &[item_id], at).await?;
        txn.commit().await?;

        let item = self.items.get_by_id(saved_item_id).await?;
        self.emitter.emit(EventKind::RemoveTags, &item, &self.user, Some(removed));
        Ok(item)
    }

    /// Renames a tag across all of the user's saved items. Items carrying
    /// both names end up with a single association under the new name.
    pub async fn rename_tag(
        &self,
        old_name: &str,
        new_name: &str,
        at: DateTime<Utc>,
    ) -> Result<Tag, ItemServiceError> {
        let new_name = normalize_tag_name(new_name)?;
        let old_rows = self.tags.rows_for_tag(old_name).await?;
        if old_rows.is_empty() {
            return Err(ItemServiceError::tag_not_found(old_name));
        }
        if old_name == new_name {
            return self.tags.get_tag_by_name(&new_name).await;
        }

        let already_tagged: BTreeSet<i64> = self
            .tags
            .rows_for_tag(&new_name)
            .await?
            .into_iter()
            .map(|row| row.item_id)
            .collect();
        let item_ids: Vec<i64> = old_rows.iter().map(|row| row.item_id).collect();
        let moved = old_rows
            .iter()
            .filter(|row| !already_tagged.contains(&row.item_id))
            .map(|row| ItemTagActiveModel {
                user_id: Set(self.user.user_id),
                item_id: Set(row.item_id),
                tag: Set(new_name.clone()),
                time_added: Set(row.time_added),
                time_updated: Set(at),
                api_id: Set(self.user.api_id.clone()),
            })
            .collect::<Vec<_>>();

        let txn = self.storage.writer()?.begin().await?;
        ItemTagEntity::delete_many()
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::Tag.eq(old_name))
            .exec(&txn)
            .await?;
        if !moved.is_empty() {
            ItemTagEntity::insert_many(moved).exec_without_returning(&txn).await?;
        }
        self.touch_items(&txn, &item_ids, at).await?;
        txn.commit().await?;

        info!(user_id = self.user.user_id, items = item_ids.len(), "Renamed tag.");
        self.tags.get_tag_by_name(&new_name).await
    }

    /// Removes a tag from every saved item of the user and returns the
    /// affected items.
    pub async fn delete_tag(
        &self,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<SavedItem>, ItemServiceError> {
        let rows = self.tags.rows_for_tag(name).await?;
        if rows.is_empty() {
            return Err(ItemServiceError::tag_not_found(name));
        }
        let item_ids: Vec<i64> = rows.iter().map(|row| row.item_id).collect();

        let txn = self.storage.writer()?.begin().await?;
        ItemTagEntity::delete_many()
            .filter(ItemTagColumn::UserId.eq(self.user.user_id))
            .filter(ItemTagColumn::Tag.eq(name))
            .exec(&txn)
            .await?;
        self.touch_items(&txn, &item_ids, at).await?;
        txn.commit().await?;

        let items = saved_items_from_rows(&self.items.find_rows(&item_ids).await?)?;
        for item in &items {
            self.emitter.emit(
                EventKind::RemoveTags,
                item,
                &self.user,
                Some(vec![name.to_string()]),
            );
        }
        info!(user_id = self.user.user_id, items = items.len(), "Deleted tag.");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::encode_tag_id;
    use crate::db::storage::Storage;
    use crate::events::ItemEvent;
    use crate::test_support::{
        collect_events, insert_item, insert_tag, recording_emitter, sample_item, setup_storage, ts,
    };
    use tokio::sync::mpsc::UnboundedReceiver;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    async fn service(
        storage: &Storage,
    ) -> (SavedItemMutationService, UnboundedReceiver<ItemEvent>) {
        let (emitter, rx) = recording_emitter();
        let service =
            SavedItemMutationService::new(UserContext::new(1), storage.write_context(), emitter)
                .unwrap();
        (service, rx)
    }

    #[tokio::test]
    async fn read_only_context_is_rejected() {
        let storage = setup_storage().await;
        let (emitter, _rx) = recording_emitter();
        let result =
            SavedItemMutationService::new(UserContext::new(1), storage.read_context(), emitter);
        assert!(matches!(result, Err(ItemServiceError::ReadOnlyStorage)));
    }

    #[tokio::test]
    async fn archive_reports_missing_ids_alongside_updates() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        insert_item(&storage, 2, 11, 0, 0, ts(100)).await;
        let (service, mut rx) = service(&storage).await;

        let result = service.archive(&ids(&["10", "11"]), ts(500)).await.unwrap();

        assert_eq!(result.updated.len(), 1);
        let item = &result.updated[0];
        assert_eq!(item.id, "10");
        assert_eq!(item.status, SavedItemStatus::Archived);
        assert_eq!(item.archived_at, Some(ts(500)));
        assert_eq!(item.updated_at, ts(500));
        assert_eq!(result.missing, ids(&["11"]));

        let events = collect_events(&mut rx).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ArchiveItem);
        assert_eq!(events[0].saved_item.id, "10");
    }

    #[tokio::test]
    async fn archive_deduplicates_input_and_flags_invalid_ids() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        let (service, mut rx) = service(&storage).await;

        let result = service.archive(&ids(&["10", "10", "x"]), ts(500)).await.unwrap();
        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.missing, ids(&["x"]));
        assert_eq!(collect_events(&mut rx).await.len(), 1);
    }

    #[tokio::test]
    async fn archiving_twice_refreshes_the_timestamp() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        let (service, _rx) = service(&storage).await;

        service.archive(&ids(&["10"]), ts(500)).await.unwrap();
        let second = service.archive(&ids(&["10"]), ts(900)).await.unwrap();

        assert!(second.missing.is_empty());
        assert_eq!(second.updated[0].status, SavedItemStatus::Archived);
        assert_eq!(second.updated[0].archived_at, Some(ts(900)));
    }

    #[tokio::test]
    async fn unarchive_clears_archived_at() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 1, 0, ts(100)).await;
        let (service, mut rx) = service(&storage).await;

        let result = service.unarchive(&ids(&["10"]), ts(500)).await.unwrap();
        let item = &result.updated[0];
        assert_eq!(item.status, SavedItemStatus::Unread);
        assert_eq!(item.archived_at, None);
        assert_eq!(collect_events(&mut rx).await[0].kind, EventKind::UnarchiveItem);
    }

    #[tokio::test]
    async fn favorite_keeps_existing_favorited_at() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 1, ts(100)).await;
        insert_item(&storage, 1, 11, 0, 0, ts(100)).await;
        let (service, _rx) = service(&storage).await;

        let result = service.favorite(&ids(&["10", "11"]), ts(500)).await.unwrap();
        let by_id = |id: &str| result.updated.iter().find(|i| i.id == id).unwrap().clone();
        assert_eq!(by_id("10").favorited_at, Some(ts(100)));
        assert_eq!(by_id("11").favorited_at, Some(ts(500)));
        assert!(by_id("11").is_favorite);
    }

    #[tokio::test]
    async fn unfavorite_clears_favorited_at() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 1, ts(100)).await;
        let (service, mut rx) = service(&storage).await;

        let result = service.unfavorite(&ids(&["10"]), ts(500)).await.unwrap();
        assert!(!result.updated[0].is_favorite);
        assert_eq!(result.updated[0].favorited_at, None);
        assert_eq!(collect_events(&mut rx).await[0].kind, EventKind::UnfavoriteItem);
    }

    #[tokio::test]
    async fn delete_soft_deletes_and_drops_tags() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        insert_tag(&storage, 1, 10, "rust").await;
        let (service, mut rx) = service(&storage).await;

        let result = service.delete(&ids(&["10"]), ts(500)).await.unwrap();
        let item = &result.updated[0];
        assert_eq!(item.status, SavedItemStatus::Deleted);
        assert_eq!(item.deleted_at, Some(ts(500)));
        assert_eq!(item.created_at, ts(100));

        let tags = TagDataService::new(UserContext::new(1), storage.read_context());
        assert!(matches!(
            tags.get_tag_by_name("rust").await,
            Err(ItemServiceError::NotFound { .. })
        ));
        assert_eq!(collect_events(&mut rx).await[0].kind, EventKind::DeleteItem);
    }

    #[tokio::test]
    async fn deleted_items_stay_deleted() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        let (service, mut rx) = service(&storage).await;

        service.delete(&ids(&["10"]), ts(500)).await.unwrap();
        assert_eq!(collect_events(&mut rx).await.len(), 1);

        let unarchived = service.unarchive(&ids(&["10"]), ts(600)).await.unwrap();
        assert!(unarchived.updated.is_empty());
        assert_eq!(unarchived.missing, ids(&["10"]));

        let favorited = service.favorite(&ids(&["10"]), ts(700)).await.unwrap();
        assert!(favorited.updated.is_empty());
        assert_eq!(favorited.missing, ids(&["10"]));
        assert!(collect_events(&mut rx).await.is_empty());

        let item = service.reader().get_by_id("10").await.unwrap();
        assert_eq!(item.status, SavedItemStatus::Deleted);
        assert!(!item.is_favorite);
        assert_eq!(item.deleted_at, Some(ts(500)));
    }

    #[tokio::test]
    async fn unreflected_state_is_not_announced() {
        let storage = setup_storage().await;
        let (service, mut rx) = service(&storage).await;

        // An unread item does not reflect an archive.
        let unread = sample_item("10");
        let mut archived = sample_item("11");
        archived.status = SavedItemStatus::Archived;
        archived.is_archived = true;

        let emitted = service.emit_reflected(StatusTransition::Archive, &[unread, archived]);
        assert_eq!(emitted, 1);
        let events = collect_events(&mut rx).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].saved_item.id, "11");
    }

    #[tokio::test]
    async fn replace_tags_rejects_empty_list_before_touching_storage() {
        let storage = setup_storage().await;
        let (service, mut rx) = service(&storage).await;

        // Item 10 does not exist; validation must win over the lookup.
        let err = service.replace_tags("10", &[], ts(500)).await.unwrap_err();
        assert!(matches!(err, ItemServiceError::Validation(_)));
        assert!(collect_events(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn replace_tags_requires_existing_item() {
        let storage = setup_storage().await;
        let (service, _rx) = service(&storage).await;

        let err = service
            .replace_tags("10", &[encode_tag_id("rust")], ts(500))
            .await
            .unwrap_err();
        assert!(matches!(err, ItemServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn replace_tags_swaps_the_whole_set() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        insert_tag(&storage, 1, 10, "old").await;
        let (service, mut rx) = service(&storage).await;

        let item = service
            .replace_tags("10", &[encode_tag_id("new"), encode_tag_id("other")], ts(500))
            .await
            .unwrap();
        assert_eq!(item.updated_at, ts(500));

        let tags = TagDataService::new(UserContext::new(1), storage.read_context());
        let names: Vec<String> = tags
            .get_tags_by_user_item("10")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ids(&["new", "other"]));

        let events = collect_events(&mut rx).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ReplaceTags);
        assert_eq!(events[0].tags, Some(ids(&["new", "other"])));
    }

    #[tokio::test]
    async fn replace_tags_rejects_undecodable_ids() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        let (service, _rx) = service(&storage).await;

        let err = service.replace_tags("10", &ids(&["not-hex"]), ts(500)).await.unwrap_err();
        assert!(matches!(err, ItemServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn removing_only_association_deletes_the_tag() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        insert_item(&storage, 1, 11, 0, 0, ts(100)).await;
        insert_tag(&storage, 1, 10, "solo").await;
        insert_tag(&storage, 1, 10, "shared").await;
        insert_tag(&storage, 1, 11, "shared").await;
        let (service, mut rx) = service(&storage).await;

        service.remove_all_tags("10", ts(500)).await.unwrap();

        let tags = TagDataService::new(UserContext::new(1), storage.read_context());
        assert!(matches!(
            tags.get_tag_by_name("solo").await,
            Err(ItemServiceError::NotFound { .. })
        ));
        let shared = tags.get_tag_by_name("shared").await.unwrap();
        assert_eq!(shared.saved_item_ids, ids(&["11"]));

        let events = collect_events(&mut rx).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ClearTags);
        assert_eq!(events[0].tags, Some(ids(&["shared", "solo"])));
    }

    #[tokio::test]
    async fn clearing_an_untagged_item_emits_nothing() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        let (service, mut rx) = service(&storage).await;

        service.remove_all_tags("10", ts(500)).await.unwrap();
        assert!(collect_events(&mut rx).await.is_empty());
        assert!(matches!(
            service.remove_all_tags("99", ts(500)).await,
            Err(ItemServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn add_and_remove_named_tags() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        insert_tag(&storage, 1, 10, "kept").await;
        let (service, mut rx) = service(&storage).await;

        service.add_tags("10", &ids(&["kept", " fresh "]), ts(500)).await.unwrap();
        service.remove_tags("10", &ids(&["kept", "absent"]), ts(600)).await.unwrap();

        let tags = TagDataService::new(UserContext::new(1), storage.read_context());
        let names: Vec<String> = tags
            .get_tags_by_user_item("10")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ids(&["fresh"]));

        let events = collect_events(&mut rx).await;
        assert_eq!(events.len(), 2);
        let added = events.iter().find(|e| e.kind == EventKind::AddTags).unwrap();
        assert_eq!(added.tags, Some(ids(&["fresh"])));
        let removed = events.iter().find(|e| e.kind == EventKind::RemoveTags).unwrap();
        assert_eq!(removed.tags, Some(ids(&["kept"])));
    }

    #[tokio::test]
    async fn rename_tag_merges_into_existing_name() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        insert_item(&storage, 1, 11, 0, 0, ts(100)).await;
        insert_tag(&storage, 1, 10, "old").await;
        insert_tag(&storage, 1, 11, "old").await;
        insert_tag(&storage, 1, 11, "new").await;
        let (service, _rx) = service(&storage).await;

        let tag = service.rename_tag("old", "new", ts(500)).await.unwrap();
        assert_eq!(tag.name, "new");
        assert_eq!(tag.saved_item_ids, ids(&["10", "11"]));

        assert!(matches!(
            service.rename_tag("old", "x", ts(600)).await,
            Err(ItemServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_tag_emits_once_per_item() {
        let storage = setup_storage().await;
        insert_item(&storage, 1, 10, 0, 0, ts(100)).await;
        insert_item(&storage, 1, 11, 0, 0, ts(100)).await;
        insert_tag(&storage, 1, 10, "gone").await;
        insert_tag(&storage, 1, 11, "gone").await;
        let (service, mut rx) = service(&storage).await;

        let items = service.delete_tag("gone", ts(500)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.updated_at == ts(500)));

        let events = collect_events(&mut rx).await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == EventKind::RemoveTags));
    }
}
