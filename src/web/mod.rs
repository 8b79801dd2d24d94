use axum::{Router, http::Method, middleware as axum_middleware, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::storage::Storage;
use crate::events::ItemsEventEmitter;
use crate::resolver::UrlResolver;
use crate::web::{middleware::user_context::user_context, routes::*};

pub use error::AppError;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub resolver: Arc<dyn UrlResolver>,
    pub emitter: ItemsEventEmitter,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(
    storage: Storage,
    resolver: Arc<dyn UrlResolver>,
    emitter: ItemsEventEmitter,
) -> Router {
    let app_state = Arc::new(AppState {
        storage,
        resolver,
        emitter,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest(
            "/api/saved-items",
            saved_item_routes::create_saved_items_router()
                .route_layer(axum_middleware::from_fn(user_context)),
        )
        .nest(
            "/api/tags",
            tag_routes::create_tags_router().route_layer(axum_middleware::from_fn(user_context)),
        )
        .with_state(app_state)
        .layer(cors)
}
