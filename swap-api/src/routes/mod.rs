//! API route definitions

mod batch;
mod health;
mod opportunities;
mod recommendations;

use axum::{
    extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse,
    response::Response, Json, Router,
};
use serde::Serialize;
use swap_core::SwapError;
use tracing::{debug, error};

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(recommendations::routes())
        .merge(batch::routes())
        .merge(opportunities::routes())
        .merge(health::routes())
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map an engine error onto a status code and `{error}` body
pub fn error_response(e: SwapError) -> Response {
    let status = match &e {
        SwapError::NotFound(_) => StatusCode::NOT_FOUND,
        SwapError::BatchInProgress => StatusCode::CONFLICT,
        _ => {
            error!("Request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Keep the rejection's status but answer with the same `{error}` body
pub fn rejection_response(rejection: JsonRejection) -> Response {
    debug!("Rejected request body: {}", rejection.body_text());
    (
        rejection.status(),
        Json(ErrorResponse {
            error: rejection.body_text(),
        }),
    )
        .into_response()
}

/// Run blocking store work off the async runtime
pub async fn blocking<T, F>(f: F) -> Result<T, SwapError>
where
    F: FnOnce() -> Result<T, SwapError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SwapError::internal(format!("Blocking task failed: {}", e)))?
}
