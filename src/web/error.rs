use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::db::error::ItemServiceError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {msg}"),
            ),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<ItemServiceError> for AppError {
    fn from(err: ItemServiceError) -> Self {
        match err {
            ItemServiceError::NotFound { .. } => AppError::NotFound(err.to_string()),
            ItemServiceError::Validation(msg) => AppError::InvalidInput(msg),
            ItemServiceError::Database(e) => {
                error!(error = %e, "Database error while serving request.");
                AppError::DatabaseError(e.to_string())
            }
            ItemServiceError::MalformedRow { .. } => {
                error!(error = %err, "Storage returned a malformed row.");
                AppError::InternalServerError(err.to_string())
            }
            ItemServiceError::UpsertFailure { .. } | ItemServiceError::ReadOnlyStorage => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}
