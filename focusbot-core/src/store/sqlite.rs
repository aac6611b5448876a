//! SQLite-backed statistics store.

use crate::error::{Error, Result};
use crate::store::types::{SessionRecord, UserStats};
use crate::store::StatsStore;
use crate::types::{FinalizedSession, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Schema bootstrap. Columns follow the persisted contract shared with the
/// original deployment (`guild_id` is the room key).
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE,
    username TEXT NOT NULL,
    total_minutes INTEGER NOT NULL DEFAULT 0,
    sessions_completed INTEGER NOT NULL DEFAULT 0,
    last_session INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_user_stats_total_minutes
    ON user_stats(total_minutes);

CREATE TABLE IF NOT EXISTS focus_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    guild_id INTEGER NOT NULL,
    creator_id INTEGER NOT NULL,
    duration_minutes INTEGER NOT NULL,
    started_at INTEGER NOT NULL,
    ended_at INTEGER,
    participant_count INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'active'
);
CREATE INDEX IF NOT EXISTS idx_focus_sessions_creator
    ON focus_sessions(creator_id, started_at);
";

/// Database connection wrapper.
///
/// Thread-safe via internal Mutex. All database operations acquire the lock.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(Error::Database)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::Database)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Check database connectivity
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        conn.execute_batch("SELECT 1").map_err(Error::Database)
    }

    fn map_user_stats(row: &rusqlite::Row) -> rusqlite::Result<UserStats> {
        Ok(UserStats {
            user_id: row.get(0)?,
            username: row.get(1)?,
            total_minutes: row.get(2)?,
            sessions_completed: row.get(3)?,
            last_session: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn map_session_record(row: &rusqlite::Row) -> rusqlite::Result<SessionRecord> {
        Ok(SessionRecord {
            id: row.get(0)?,
            room_id: row.get(1)?,
            creator_id: row.get(2)?,
            duration_minutes: row.get(3)?,
            started_at: row.get(4)?,
            ended_at: row.get(5)?,
            participant_count: row.get(6)?,
            status: row.get(7)?,
        })
    }
}

#[async_trait]
impl StatsStore for SqliteStore {
    async fn create_session_record(
        &self,
        room_id: i64,
        creator_id: i64,
        duration_minutes: i64,
        started_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        conn.execute(
            "INSERT INTO focus_sessions
             (guild_id, creator_id, duration_minutes, started_at, participant_count, status)
             VALUES (?1, ?2, ?3, ?4, 1, 'active')",
            params![
                room_id,
                creator_id,
                duration_minutes,
                started_at.timestamp_millis()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn finalize_session(&self, outcome: &FinalizedSession) -> Result<()> {
        let mut conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let tx = conn.transaction()?;
        let ended_ms = outcome.ended_at.timestamp_millis();

        if let Some(record_id) = outcome.record_id {
            tx.execute(
                "UPDATE focus_sessions
                 SET ended_at = ?1, status = ?2, participant_count = ?3
                 WHERE id = ?4",
                params![
                    ended_ms,
                    outcome.status.as_str(),
                    outcome.members.len() as i64,
                    record_id
                ],
            )?;
        }

        // Only completed sessions credit member aggregates; cancellations
        // close the record and nothing else.
        if outcome.status == SessionStatus::Completed {
            for member in &outcome.members {
                tx.execute(
                    "INSERT INTO user_stats
                     (user_id, username, total_minutes, sessions_completed,
                      last_session, created_at, updated_at)
                     VALUES (?1, ?2, ?3, 1, ?4, ?4, ?4)
                     ON CONFLICT(user_id) DO UPDATE SET
                         total_minutes = total_minutes + excluded.total_minutes,
                         sessions_completed = sessions_completed + 1,
                         username = excluded.username,
                         last_session = excluded.last_session,
                         updated_at = excluded.updated_at",
                    params![
                        member.user_id,
                        member.display_name,
                        outcome.duration_minutes,
                        ended_ms
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn user_stats(&self, user_id: i64) -> Result<Option<UserStats>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT user_id, username, total_minutes, sessions_completed,
                    last_session, created_at, updated_at
             FROM user_stats WHERE user_id = ?1",
        )?;

        Ok(stmt
            .query_row(params![user_id], Self::map_user_stats)
            .optional()?)
    }

    async fn top_users(&self, limit: u32) -> Result<Vec<UserStats>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT user_id, username, total_minutes, sessions_completed,
                    last_session, created_at, updated_at
             FROM user_stats
             ORDER BY total_minutes DESC, user_id ASC
             LIMIT ?1",
        )?;

        let users = stmt
            .query_map(params![limit], Self::map_user_stats)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn completed_sessions_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, guild_id, creator_id, duration_minutes, started_at,
                    ended_at, participant_count, status
             FROM focus_sessions
             WHERE creator_id = ?1 AND started_at >= ?2 AND status = 'completed'
             ORDER BY started_at DESC",
        )?;

        let records = stmt
            .query_map(
                params![user_id, since.timestamp_millis()],
                Self::map_session_record,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
