//! Core types for focus sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// Participants and session state
// ─────────────────────────────────────────────────────────────────────────────

/// A chat-platform user taking part in a session.
///
/// IDs are 64-bit platform snowflakes; the display name is a mutable label
/// refreshed every time the user completes a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: i64,
    pub display_name: String,
}

impl Participant {
    pub fn new(user_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

/// Terminal state of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

/// A live focus session. At most one exists per room; absence from the
/// registry means "no session", there is no empty placeholder state.
#[derive(Debug, Clone)]
pub struct FocusSession {
    pub room_id: i64,
    pub creator: Participant,
    /// Member set keyed by user id. Never empty while the session is
    /// registered; the registry drops the session when the last member leaves.
    pub members: HashMap<i64, Participant>,
    /// Requested length in minutes, validated to [1, 480].
    pub duration_minutes: i64,
    pub started_at: DateTime<Utc>,
    /// Absolute expiry instant. Immutable after creation.
    pub end_time: DateTime<Utc>,
    /// Durable record handle; None when record creation failed (session
    /// creation never fails on persistence alone).
    pub record_id: Option<i64>,
}

impl FocusSession {
    pub fn new(
        room_id: i64,
        creator: Participant,
        duration_minutes: i64,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut members = HashMap::new();
        members.insert(creator.user_id, creator.clone());
        Self {
            room_id,
            creator,
            members,
            duration_minutes,
            started_at,
            end_time: started_at + Duration::minutes(duration_minutes),
            record_id: None,
        }
    }

    /// Whether the session has reached its deadline. The boundary is
    /// inclusive: a session observed exactly at its end time is expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operation results
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only snapshot of a live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub room_id: i64,
    pub creator: Participant,
    /// Members ordered by user id for stable output.
    pub members: Vec<Participant>,
    pub member_count: usize,
    pub duration_minutes: i64,
    pub started_at: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Seconds until expiry, clamped to zero.
    pub remaining_seconds: i64,
}

impl SessionView {
    pub(crate) fn of(session: &FocusSession, now: DateTime<Utc>) -> Self {
        let mut members: Vec<Participant> = session.members.values().cloned().collect();
        members.sort_by_key(|m| m.user_id);
        Self {
            room_id: session.room_id,
            creator: session.creator.clone(),
            member_count: members.len(),
            members,
            duration_minutes: session.duration_minutes,
            started_at: session.started_at,
            end_time: session.end_time,
            remaining_seconds: (session.end_time - now).num_seconds().max(0),
        }
    }
}

/// Result of joining a session.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub member_count: usize,
    pub end_time: DateTime<Utc>,
}

/// Result of leaving a session.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub remaining: usize,
    /// True when the departure emptied the session and it was cancelled.
    pub session_ended: bool,
}

/// Result of ending a session early.
#[derive(Debug, Clone)]
pub struct EndOutcome {
    pub participant_count: usize,
}

/// Everything the store needs to close out a session in one call.
#[derive(Debug, Clone)]
pub struct FinalizedSession {
    pub room_id: i64,
    pub record_id: Option<i64>,
    pub status: SessionStatus,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub members: Vec<Participant>,
}

impl FinalizedSession {
    pub(crate) fn of(
        session: &FocusSession,
        status: SessionStatus,
        ended_at: DateTime<Utc>,
    ) -> Self {
        let mut members: Vec<Participant> = session.members.values().cloned().collect();
        members.sort_by_key(|m| m.user_id);
        Self {
            room_id: session.room_id,
            record_id: session.record_id,
            status,
            ended_at,
            duration_minutes: session.duration_minutes,
            members,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_end_time_derived_from_duration() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let session = FocusSession::new(1, Participant::new(10, "ada"), 25, t0);
        assert_eq!(session.end_time, t0 + Duration::minutes(25));
        assert_eq!(session.members.len(), 1);
        assert!(session.members.contains_key(&10));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let session = FocusSession::new(1, Participant::new(10, "ada"), 10, t0);
        assert!(!session.is_expired(t0 + Duration::minutes(9)));
        assert!(session.is_expired(t0 + Duration::minutes(10)));
        assert!(session.is_expired(t0 + Duration::minutes(11)));
    }

    #[test]
    fn test_view_clamps_remaining_to_zero() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let session = FocusSession::new(1, Participant::new(10, "ada"), 5, t0);
        let view = SessionView::of(&session, t0 + Duration::minutes(7));
        assert_eq!(view.remaining_seconds, 0);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(SessionStatus::Completed.as_str(), "completed");
        assert_eq!(
            serde_json::to_string(&SessionStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
