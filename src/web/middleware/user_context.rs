use axum::{body::Body as AxumBody, http::Request, middleware::Next, response::Response};
use tracing::warn;

use crate::context::UserContext;
use crate::web::error::AppError;

/// Header carrying the authenticated user id, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "userid";
pub const API_ID_HEADER: &str = "apiid";

/// Builds the [`UserContext`] for the request from gateway headers and stores
/// it as a request extension. Authentication itself happens upstream.
pub async fn user_context(mut req: Request<AxumBody>, next: Next) -> Result<Response, AppError> {
    let headers = req.headers();
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            warn!("Request without a valid userid header.");
            AppError::Unauthorized("missing or invalid userid header".to_string())
        })?;
    let api_id = headers
        .get(API_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut context = UserContext::new(user_id);
    if let Some(api_id) = api_id {
        context = context.with_api_id(api_id);
    }
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}
