//! Batch optimization trigger

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use swap_services::BatchStats;
use tracing::info;

use super::{blocking, error_response};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/batch/optimize", post(run_batch))
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    success: bool,
    stats: BatchStats,
}

/// Run the optimizer now; 409 if a run is already in flight
async fn run_batch(State(state): State<AppState>) -> impl IntoResponse {
    info!("Batch optimization requested");

    let optimizer = state.optimizer.clone();
    match blocking(move || optimizer.run()).await {
        Ok(stats) => Json(BatchResponse {
            success: true,
            stats,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
