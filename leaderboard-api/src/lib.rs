// Leaderboard API Library
//
// HTTP endpoints and the WebSocket subscription surface

pub mod http;

pub use http::{create_router, AppState};
