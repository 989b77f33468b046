//! Swap Engine API Server
//!
//! HTTP API for item recommendations and batch exchange optimization.

mod config;
mod routes;
mod scheduler;

use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use swap_services::{BatchOptimizer, PolicyProvider, RecommendationService, SwapStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ApiConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SwapStore>,
    pub recommendations: Arc<RecommendationService>,
    pub optimizer: Arc<BatchOptimizer>,
}

impl AppState {
    /// Wire services over one store, which also serves the active policy
    pub fn new(store: Arc<SwapStore>) -> Self {
        let policies: Arc<dyn PolicyProvider> = store.clone();
        Self {
            recommendations: Arc::new(RecommendationService::new(store.clone(), policies.clone())),
            optimizer: Arc::new(BatchOptimizer::new(store.clone(), policies)),
            store,
        }
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,swap_api=debug,swap_services=debug")),
        )
        .init();

    info!("Starting Swap Engine API");

    let config = ApiConfig::from_env();

    info!("Opening swap store at: {}", config.db_path);
    let store = Arc::new(SwapStore::new(&config.db_path)?);
    let state = AppState::new(store);

    match config.batch_interval() {
        Some(period) => {
            scheduler::spawn_batch_scheduler(state.optimizer.clone(), period);
        }
        None => info!("Batch scheduler disabled (BATCH_INTERVAL_SECS=0)"),
    }

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
