//! Health check endpoints

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use leaderboard_hub::HubStats;

use super::{AppResult, AppState};

/// Health check router
pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/hub", get(hub_health))
}

/// Basic health check (always returns OK if server is running)
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Hub registry counters; fails if the hub actor is gone
pub async fn hub_health(State(state): State<AppState>) -> AppResult<Json<HubStats>> {
    Ok(Json(state.hub.stats().await?))
}
