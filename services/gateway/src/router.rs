//! Axum Router Configuration

use crate::{state::AppState, ws};
use axum::{Router, routing::get};

/// Creates the main Axum router for the application.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", get(ws::connect))
        .with_state(state)
}
