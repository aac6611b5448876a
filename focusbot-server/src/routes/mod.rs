//! API route modules.

pub mod commands;
pub mod health;
pub mod stats;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(commands::router())
        .merge(stats::router());

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
