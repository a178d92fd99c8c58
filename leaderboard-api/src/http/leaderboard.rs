//! Score submission and ranking queries

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use leaderboard_core::models::{ChannelId, MemberRank, RankSnapshot};
use serde::{Deserialize, Serialize};

use super::{middleware::AuthUser, AppError, AppResult, AppState};

pub fn create_leaderboard_router() -> Router<AppState> {
    Router::new()
        .route("/score", post(submit_score))
        .route("/leaderboard", get(get_leaderboard))
        .route("/rank", get(get_rank))
        .route("/games", get(get_games))
}

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub game_id: Option<String>,
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitScoreResponse {
    pub message: String,
    pub rank: u64,
    pub score: i64,
}

/// `?game_id=` selector shared by the read endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ChannelQuery {
    pub game_id: Option<String>,
}

pub async fn submit_score(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> AppResult<Json<SubmitScoreResponse>> {
    let Json(req) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;

    let outcome = state
        .coordinator
        .submit(&auth.member, req.game_id, req.score)
        .await?;

    Ok(Json(SubmitScoreResponse {
        message: "Score submitted successfully".to_string(),
        rank: outcome.rank,
        score: outcome.score,
    }))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> AppResult<Json<RankSnapshot>> {
    let (_, snapshot) = state.coordinator.leaderboard(query.game_id).await?;
    Ok(Json(snapshot))
}

pub async fn get_rank(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ChannelQuery>,
) -> AppResult<Json<MemberRank>> {
    let rank = state
        .coordinator
        .member_rank(&auth.member, query.game_id)
        .await?;
    Ok(Json(rank))
}

pub async fn get_games(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<ChannelId>>> {
    Ok(Json(state.coordinator.channels_of(&auth.member).await?))
}
