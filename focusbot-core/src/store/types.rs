//! Row types for the statistics store.
//!
//! Timestamps are stored as UTC milliseconds.

use serde::{Deserialize, Serialize};

/// Durable per-user aggregates. Created on first completed participation,
/// never decremented, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: i64,
    /// Display name as of the user's most recent completed session.
    pub username: String,
    pub total_minutes: i64,
    pub sessions_completed: i64,
    pub last_session: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One row per created session, closed out at finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub room_id: i64,
    pub creator_id: i64,
    pub duration_minutes: i64,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub participant_count: i64,
    pub status: String,
}
