use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    routing::{get, post},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::context::UserContext;
use crate::db::models::{SavedItem, Tag};
use crate::db::services::{SavedItemMutationService, TagDataService};
use crate::web::models::{RenameTagRequest, TagLookupRequest, TimestampQuery};
use crate::web::{AppError, AppState};

async fn get_tag_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Tag>, AppError> {
    let service = TagDataService::new(user, app_state.storage.read_context());
    Ok(Json(service.get_tag_by_name(&name).await?))
}

async fn lookup_tags_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TagLookupRequest>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let service = TagDataService::new(user, app_state.storage.read_context());
    Ok(Json(service.get_tags_by_name(&payload.names).await?))
}

async fn rename_tag_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(payload): Json<RenameTagRequest>,
) -> Result<Json<Tag>, AppError> {
    let user_id = user.user_id;
    let service = SavedItemMutationService::new(
        user,
        app_state.storage.write_context(),
        app_state.emitter.clone(),
    )?;
    let at = payload.timestamp.unwrap_or_else(Utc::now);
    let tag = service.rename_tag(&name, &payload.new_name, at).await?;
    info!(user_id, from = %name, to = %tag.name, "Tag renamed.");
    Ok(Json(tag))
}

/// Removes the tag from every item; responds with the items it was on.
async fn delete_tag_handler(
    Extension(user): Extension<UserContext>,
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<TimestampQuery>,
) -> Result<Json<Vec<SavedItem>>, AppError> {
    let service = SavedItemMutationService::new(
        user,
        app_state.storage.write_context(),
        app_state.emitter.clone(),
    )?;
    let at = query.timestamp.unwrap_or_else(Utc::now);
    Ok(Json(service.delete_tag(&name, at).await?))
}

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lookup", post(lookup_tags_handler))
        .route(
            "/{name}",
            get(get_tag_handler).put(rename_tag_handler).delete(delete_tag_handler),
        )
}
