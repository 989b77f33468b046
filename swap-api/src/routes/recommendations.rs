//! Recommendation endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use swap_services::RecommendationRequest;
use tracing::debug;

use super::{blocking, error_response, rejection_response};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/recommendations", post(get_recommendations))
}

/// Rank candidates for a source item
async fn get_recommendations(
    State(state): State<AppState>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    debug!(
        "Recommendations for {} (limit {:?}, expanded {})",
        request.source_item_id, request.limit, request.expanded_search
    );

    let service = state.recommendations.clone();
    match blocking(move || service.recommend(&request)).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}
