// Module: http
// REST endpoints and the WebSocket subscription route

pub mod error;
pub mod health;
pub mod leaderboard;
pub mod middleware;
pub mod websocket;

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use leaderboard_core::{
    service::{JwtValidator, SubmissionCoordinator},
    Config,
};
use leaderboard_hub::BroadcastHub;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Per-connection limits taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub outbound_queue_capacity: usize,
    pub max_message_size: usize,
}

impl SessionSettings {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            outbound_queue_capacity: config.leaderboard.outbound_queue_capacity,
            max_message_size: config.leaderboard.max_message_size,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SubmissionCoordinator>,
    pub hub: BroadcastHub,
    pub jwt_validator: Arc<JwtValidator>,
    pub settings: SessionSettings,
}

/// Build the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::create_health_router())
        .merge(leaderboard::create_leaderboard_router())
        .route("/ws", get(websocket::websocket_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
