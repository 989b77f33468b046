//! Read-only views of batch output

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use swap_core::{SwapError, SwapOpportunity};

use super::{blocking, error_response};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/opportunities/{user_id}", get(list_opportunities))
        .route("/affinities/{user_id}", get(get_affinities))
}

#[derive(Debug, Serialize)]
struct OpportunitiesResponse {
    opportunities: Vec<SwapOpportunity>,
    count: usize,
}

/// Unexpired opportunities involving a user, best first
async fn list_opportunities(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let result = blocking(move || {
        store
            .opportunities_for_user(&user_id, Utc::now())
            .map_err(SwapError::from)
    })
    .await;

    match result {
        Ok(opportunities) => Json(OpportunitiesResponse {
            count: opportunities.len(),
            opportunities,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Last learned affinity snapshot for a user
async fn get_affinities(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let result = blocking(move || {
        store
            .get_affinity(&user_id)?
            .ok_or_else(|| SwapError::not_found(format!("No affinities for user {}", user_id)))
    })
    .await;

    match result {
        Ok(affinity) => Json(affinity).into_response(),
        Err(e) => error_response(e),
    }
}
