//! Durable statistics storage.
//!
//! The in-memory registry is the source of truth for session *existence*;
//! the store is best-effort, eventually-consistent storage for per-user
//! aggregates and per-session records. Store failures are logged at the
//! call sites and never block a session transition.

mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;

use crate::error::Result;
use crate::types::FinalizedSession;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage contract the session engine needs.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Insert an open session record, returning its id.
    ///
    /// Failure is non-fatal to the caller: a session whose record insert
    /// fails simply carries no record handle.
    async fn create_session_record(
        &self,
        room_id: i64,
        creator_id: i64,
        duration_minutes: i64,
        started_at: DateTime<Utc>,
    ) -> Result<i64>;

    /// Close out a session: stamp the record with its terminal status and
    /// participant count, and - only for completed sessions - credit every
    /// member's aggregates. Applied as a single transaction so a failure
    /// never leaves a half-updated member batch.
    async fn finalize_session(&self, outcome: &FinalizedSession) -> Result<()>;

    /// Aggregate stats for one user, if they ever completed a session.
    async fn user_stats(&self, user_id: i64) -> Result<Option<UserStats>>;

    /// Top users by total focus minutes, descending. Ties break by user id
    /// ascending so repeated calls over unchanged data agree.
    async fn top_users(&self, limit: u32) -> Result<Vec<UserStats>>;

    /// Completed session records started by `user_id` at or after `since`,
    /// newest first. Feeds the rolling seven-day summary.
    async fn completed_sessions_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>>;
}
