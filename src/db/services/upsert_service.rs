use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::context::UserContext;
use crate::db::entities::prelude::{SavedItemActiveModel, SavedItemColumn, SavedItemEntity};
use crate::db::error::ItemServiceError;
use crate::db::models::SavedItem;
use crate::db::services::saved_item_service::SavedItemDataService;
use crate::db::status::SavedItemStatus;
use crate::db::storage::StorageContext;
use crate::db::transform::{ZERO_DATE, saved_item_from_row};
use crate::events::{EventKind, ItemsEventEmitter};
use crate::resolver::{ResolvedUrl, UrlResolver};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItemUpsertInput {
    pub url: String,
    #[serde(default)]
    pub is_favorite: bool,
    /// Operation time; defaults to now.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Primary classification of an upsert. Exactly one applies per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    /// No live row existed (absent, or soft-deleted and now reactivated).
    NewAdd,
    /// The existing row was archived and returns to the list.
    Unarchive,
    /// The item was already in the list.
    Resave,
}

/// Decision taken before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertPlan {
    pub kind: UpsertKind,
    /// Favorite flag to write. Never downgrades an existing favorite.
    pub is_favorite: bool,
    /// Whether this call turns the favorite flag on.
    pub newly_favorited: bool,
}

impl UpsertPlan {
    pub fn new(existing: Option<&SavedItem>, requested_favorite: bool) -> Self {
        let kind = match existing.map(|item| item.status) {
            None | Some(SavedItemStatus::Deleted) => UpsertKind::NewAdd,
            Some(SavedItemStatus::Archived) => UpsertKind::Unarchive,
            Some(_) => UpsertKind::Resave,
        };
        let was_favorite = existing.is_some_and(|item| item.is_favorite);
        Self {
            kind,
            is_favorite: requested_favorite || was_favorite,
            newly_favorited: requested_favorite && !was_favorite,
        }
    }

    /// Events this upsert produces, in emission order.
    pub fn event_kinds(&self) -> Vec<EventKind> {
        let mut kinds = Vec::with_capacity(2);
        match self.kind {
            UpsertKind::NewAdd => kinds.push(EventKind::AddItem),
            UpsertKind::Unarchive => kinds.push(EventKind::UnarchiveItem),
            UpsertKind::Resave => {}
        }
        if self.newly_favorited {
            kinds.push(EventKind::FavoriteItem);
        }
        kinds
    }
}

/// Create-or-reactivate for saved items keyed by canonical item id.
///
/// The URL is resolved before anything is written, so a resolver failure
/// leaves storage untouched.
#[derive(Clone)]
pub struct SavedItemUpsertService {
    user: UserContext,
    storage: StorageContext,
    items: SavedItemDataService,
    resolver: Arc<dyn UrlResolver>,
    emitter: ItemsEventEmitter,
}

impl SavedItemUpsertService {
    pub fn new(
        user: UserContext,
        storage: StorageContext,
        resolver: Arc<dyn UrlResolver>,
        emitter: ItemsEventEmitter,
    ) -> Result<Self, ItemServiceError> {
        if !storage.is_writable() {
            return Err(ItemServiceError::ReadOnlyStorage);
        }
        Ok(Self {
            items: SavedItemDataService::new(user.clone(), storage.clone()),
            user,
            storage,
            resolver,
            emitter,
        })
    }

    pub async fn upsert(&self, input: SavedItemUpsertInput) -> Result<SavedItem, ItemServiceError> {
        let url = input.url.trim().to_string();
        if url.is_empty() {
            return Err(ItemServiceError::Validation("url must not be empty".to_string()));
        }
        let at = input.timestamp.unwrap_or_else(Utc::now);
        let failure = |reason: String| ItemServiceError::UpsertFailure {
            url: url.clone(),
            reason,
        };

        let resolved = self.resolver.resolve(&url).await.map_err(|e| {
            error!(user_id = self.user.user_id, error = %e, "Url resolution failed during upsert.");
            failure(e.to_string())
        })?;

        let existing = self.existing_item(resolved.item_id).await?;
        let plan = self
            .write(&url, &resolved, existing.as_ref(), input.is_favorite, at)
            .await
            .map_err(|e| {
                error!(
                    user_id = self.user.user_id,
                    item_id = resolved.item_id,
                    error = %e,
                    "Upsert write failed."
                );
                failure(e.to_string())
            })?;

        let item = self
            .items
            .find_by_id(&resolved.item_id.to_string())
            .await
            .map_err(|e| failure(e.to_string()))?
            .ok_or_else(|| failure("saved item missing after write".to_string()))?;

        info!(
            user_id = self.user.user_id,
            item_id = %item.id,
            kind = ?plan.kind,
            favorited = plan.newly_favorited,
            "Saved item upserted."
        );
        for kind in plan.event_kinds() {
            self.emitter.emit(kind, &item, &self.user, None);
        }
        Ok(item)
    }

    /// Writes the row and returns the plan that was applied.
    async fn write(
        &self,
        url: &str,
        resolved: &ResolvedUrl,
        existing: Option<&SavedItem>,
        requested_favorite: bool,
        at: DateTime<Utc>,
    ) -> Result<UpsertPlan, ItemServiceError> {
        let plan = UpsertPlan::new(existing, requested_favorite);
        if existing.is_some() {
            self.reactivate(resolved.item_id, &plan, at).await?;
            return Ok(plan);
        }
        if self.insert(url, resolved, &plan, at).await? {
            return Ok(plan);
        }

        // A concurrent save created the row first; this call saves onto it.
        let current = self.existing_item(resolved.item_id).await?;
        let plan = UpsertPlan::new(current.as_ref(), requested_favorite);
        self.reactivate(resolved.item_id, &plan, at).await?;
        Ok(plan)
    }

    async fn existing_item(&self, item_id: i64) -> Result<Option<SavedItem>, ItemServiceError> {
        self.items
            .find_row(item_id)
            .await?
            .as_ref()
            .map(saved_item_from_row)
            .transpose()
    }

    /// Inserts a fresh row. Returns `false` when a row for the item already
    /// exists, in which case nothing is written.
    async fn insert(
        &self,
        url: &str,
        resolved: &ResolvedUrl,
        plan: &UpsertPlan,
        at: DateTime<Utc>,
    ) -> Result<bool, ItemServiceError> {
        let model = SavedItemActiveModel {
            user_id: Set(self.user.user_id),
            item_id: Set(resolved.item_id),
            resolved_id: Set(resolved.resolved_id),
            given_url: Set(url.to_string()),
            title: Set(resolved.title.clone()),
            status: Set(SavedItemStatus::Unread.code()),
            favorite: Set(i16::from(plan.is_favorite)),
            time_added: Set(at),
            time_updated: Set(at),
            time_read: Set(ZERO_DATE),
            time_favorited: Set(if plan.is_favorite { at } else { ZERO_DATE }),
            api_id: Set(self.user.api_id.clone()),
        };
        let inserted = SavedItemEntity::insert(model)
            .on_conflict(
                OnConflict::columns([SavedItemColumn::UserId, SavedItemColumn::ItemId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.storage.writer()?)
            .await?;
        Ok(inserted > 0)
    }

    async fn reactivate(
        &self,
        item_id: i64,
        plan: &UpsertPlan,
        at: DateTime<Utc>,
    ) -> Result<(), ItemServiceError> {
        let mut update = SavedItemEntity::update_many()
            .col_expr(SavedItemColumn::Status, Expr::value(SavedItemStatus::Unread.code()))
            .col_expr(SavedItemColumn::Favorite, Expr::value(i16::from(plan.is_favorite)))
            .col_expr(SavedItemColumn::TimeRead, Expr::value(ZERO_DATE))
            .col_expr(SavedItemColumn::TimeUpdated, Expr::value(at));
        if plan.newly_favorited {
            update = update.col_expr(SavedItemColumn::TimeFavorited, Expr::value(at));
        }
        update
            .filter(SavedItemColumn::UserId.eq(self.user.user_id))
            .filter(SavedItemColumn::ItemId.eq(item_id))
            .exec(self.storage.writer()?)
            .await?;
        Ok(())
    }
}
