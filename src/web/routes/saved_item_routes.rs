use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    routing::{get, post},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::context::UserContext;
use crate::db::models::{BulkMutationPayload, SavedItem, Tag};
use crate::db::services::{
    SavedItemDataService, SavedItemLoader, SavedItemMutationService, SavedItemUpsertInput,
    SavedItemUpsertService, TagDataService,
};
use crate::db::status::StatusTransition;
use crate::web::models::{
    BatchGetRequest, BulkStatusRequest, ReplaceTagsRequest, TagNamesRequest, TimestampQuery,
    bulk_operation_path,
};
use crate::web::{AppError, AppState};

fn mutation_service(
    app_state: &AppState,
    user: UserContext,
) -> Result<SavedItemMutationService, AppError> {
    Ok(SavedItemMutationService::new(
        user,
        app_state.storage.write_context(),
        app_state.emitter.clone(),
    )?)
}

async fn get_saved_item_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SavedItem>, AppError> {
    let service = SavedItemDataService::new(user, app_state.storage.read_context());
    Ok(Json(service.get_by_id(&id).await?))
}

/// Returns one entry per requested id, in request order; unknown ids are `null`.
async fn batch_get_saved_items_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<BatchGetRequest>,
) -> Result<Json<Vec<Option<SavedItem>>>, AppError> {
    let loader = SavedItemLoader::new(SavedItemDataService::new(
        user,
        app_state.storage.read_context(),
    ));
    Ok(Json(loader.load_many(&payload.ids).await?))
}

async fn upsert_saved_item_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SavedItemUpsertInput>,
) -> Result<Json<SavedItem>, AppError> {
    let service = SavedItemUpsertService::new(
        user,
        app_state.storage.write_context(),
        app_state.resolver.clone(),
        app_state.emitter.clone(),
    )?;
    Ok(Json(service.upsert(payload).await?))
}

async fn bulk_status_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(transition): Path<StatusTransition>,
    Json(payload): Json<BulkStatusRequest>,
) -> Result<Json<BulkMutationPayload>, AppError> {
    let user_id = user.user_id;
    let service = mutation_service(&app_state, user)?;
    let at = payload.timestamp.unwrap_or_else(Utc::now);
    let result = service.apply(transition, &payload.ids, at).await?;
    info!(
        user_id,
        %transition,
        updated = result.updated.len(),
        missing = result.missing.len(),
        "Bulk status mutation applied."
    );
    Ok(Json(result.into_payload(&[bulk_operation_path(transition)])))
}

async fn get_item_tags_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let service = TagDataService::new(user, app_state.storage.read_context());
    Ok(Json(service.get_tags_by_user_item(&id).await?))
}

async fn replace_item_tags_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ReplaceTagsRequest>,
) -> Result<Json<SavedItem>, AppError> {
    let service = mutation_service(&app_state, user)?;
    let at = payload.timestamp.unwrap_or_else(Utc::now);
    Ok(Json(service.replace_tags(&id, &payload.tag_ids, at).await?))
}

async fn add_item_tags_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<TagNamesRequest>,
) -> Result<Json<SavedItem>, AppError> {
    let service = mutation_service(&app_state, user)?;
    let at = payload.timestamp.unwrap_or_else(Utc::now);
    Ok(Json(service.add_tags(&id, &payload.names, at).await?))
}

async fn remove_item_tags_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<TagNamesRequest>,
) -> Result<Json<SavedItem>, AppError> {
    let service = mutation_service(&app_state, user)?;
    let at = payload.timestamp.unwrap_or_else(Utc::now);
    Ok(Json(service.remove_tags(&id, &payload.names, at).await?))
}

async fn clear_item_tags_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TimestampQuery>,
) -> Result<Json<SavedItem>, AppError> {
    let service = mutation_service(&app_state, user)?;
    let at = query.timestamp.unwrap_or_else(Utc::now);
    Ok(Json(service.remove_all_tags(&id, at).await?))
}

// Bulk transitions share the `{id}` segment with single-item reads; the
// POST handler parses it as a transition name instead.
pub fn create_saved_items_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(upsert_saved_item_handler))
        .route("/batch", post(batch_get_saved_items_handler))
        .route("/{id}", get(get_saved_item_handler).post(bulk_status_handler))
        .route(
            "/{id}/tags",
            get(get_item_tags_handler)
                .put(replace_item_tags_handler)
                .post(add_item_tags_handler)
                .delete(clear_item_tags_handler),
        )
        .route("/{id}/tags/remove", post(remove_item_tags_handler))
}
