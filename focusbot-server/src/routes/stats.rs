//! Read-only session and statistics views.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Duration;
use focusbot_core::types::SessionView;
use focusbot_core::StatsStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rooms/{room_id}/session", get(room_session))
        .route("/users/{user_id}/stats", get(user_stats))
        .route("/leaderboard", get(leaderboard))
}

/// Snapshot of a room's live session
async fn room_session(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let now = state.clock.now();
    let view = state
        .registry
        .status(room_id, now)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match view {
        Some(view) => Ok(Json(view)),
        None => Err((StatusCode::NOT_FOUND, "no active session".to_string())),
    }
}

#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    pub user_id: i64,
    pub username: String,
    pub total_minutes: i64,
    pub sessions_completed: i64,
    /// Minutes from completed sessions started in the last seven days.
    pub weekly_minutes: i64,
}

/// All-time and rolling seven-day aggregates for one user
async fn user_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserStatsResponse>, (StatusCode, String)> {
    let stats = state
        .store
        .user_stats(user_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "no stats for user".to_string()))?;

    let week_start = state.clock.now() - Duration::days(7);
    let weekly_minutes = state
        .store
        .completed_sessions_since(user_id, week_start)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .iter()
        .map(|s| s.duration_minutes)
        .sum();

    Ok(Json(UserStatsResponse {
        user_id: stats.user_id,
        username: stats.username,
        total_minutes: stats.total_minutes,
        sessions_completed: stats.sessions_completed,
        weekly_minutes,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: i64,
    pub username: String,
    pub total_minutes: i64,
    pub sessions_completed: i64,
}

/// Top users by total focus minutes
async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, (StatusCode, String)> {
    let top = state
        .store
        .top_users(query.limit.min(100))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let entries = top
        .into_iter()
        .enumerate()
        .map(|(i, user)| LeaderboardEntry {
            rank: i + 1,
            user_id: user.user_id,
            username: user.username,
            total_minutes: user.total_minutes,
            sessions_completed: user.sessions_completed,
        })
        .collect();

    Ok(Json(entries))
}
