//! In-memory registry of per-room focus sessions.
//!
//! One entry per room, at most. Absence means "no session"; there is no
//! empty placeholder. All read-modify-write access goes through one mutex,
//! and the lock is never held across an await: store writes happen strictly
//! after the in-memory transition has settled, so the registry stays the
//! source of truth for session existence while the store lags behind it.
//!
//! A session removed under the lock is finalized by exactly the caller that
//! removed it, which is what keeps finalize from running twice when a user
//! command races the expiry sweep.

use crate::error::{Error, Result};
use crate::store::StatsStore;
use crate::types::{
    EndOutcome, FinalizedSession, FocusSession, JoinOutcome, LeaveOutcome, Participant,
    SessionStatus, SessionView,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Allowed session length in minutes.
pub const MIN_DURATION_MINUTES: i64 = 1;
pub const MAX_DURATION_MINUTES: i64 = 480;

/// Registry of live sessions, shared between command handling and the
/// expiry scheduler.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<i64, FocusSession>>,
    store: Arc<dyn StatsStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            store,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<i64, FocusSession>>> {
        self.sessions.lock().map_err(|_| Error::RegistryPoisoned)
    }

    /// Start a session in `room_id` with the creator as sole member.
    ///
    /// The in-memory session is registered as soon as validation passes;
    /// the durable record insert runs afterwards and its failure only
    /// leaves the session without a record handle.
    pub async fn create(
        &self,
        room_id: i64,
        creator: Participant,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionView> {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(Error::InvalidDuration {
                minutes: duration_minutes,
            });
        }

        let session = FocusSession::new(room_id, creator, duration_minutes, now);
        {
            let mut sessions = self.lock()?;
            if let Some(existing) = sessions.get(&room_id) {
                if !existing.is_expired(now) {
                    return Err(Error::SessionAlreadyActive {
                        minutes_remaining: (existing.end_time - now).num_minutes(),
                    });
                }
                // Stale session the sweep has not reaped yet: treated as
                // absent and overwritten. Its removal here and in the sweep
                // are idempotent.
            }
            sessions.insert(room_id, session.clone());
        }

        info!(
            room_id,
            creator = %session.creator.display_name,
            duration_minutes,
            "focus session started"
        );

        match self
            .store
            .create_session_record(room_id, session.creator.user_id, duration_minutes, now)
            .await
        {
            Ok(record_id) => {
                let mut sessions = self.lock()?;
                if let Some(current) = sessions.get_mut(&room_id) {
                    // Attach only if the slot still holds the session we
                    // just created; it may have expired and been replaced
                    // while the insert ran.
                    if current.started_at == session.started_at
                        && current.creator.user_id == session.creator.user_id
                    {
                        current.record_id = Some(record_id);
                    }
                }
            }
            Err(e) => {
                warn!(room_id, error = %e, "could not persist session record, continuing without one");
            }
        }

        Ok(SessionView::of(&session, now))
    }

    /// Add `member` to the room's session.
    pub fn join(
        &self,
        room_id: i64,
        member: Participant,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome> {
        let mut sessions = self.lock()?;
        let session = sessions.get_mut(&room_id).ok_or(Error::NoActiveSession)?;

        if session.is_expired(now) {
            // Too late: drop the entry and let the caller know. Completion
            // credit stays with the sweep, which may have raced us here;
            // either removal wins harmlessly.
            sessions.remove(&room_id);
            return Err(Error::SessionJustExpired);
        }

        if session.members.contains_key(&member.user_id) {
            return Err(Error::AlreadyMember);
        }

        session.members.insert(member.user_id, member);
        Ok(JoinOutcome {
            member_count: session.members.len(),
            end_time: session.end_time,
        })
    }

    /// Remove `user_id` from the room's session. A departure that empties
    /// the member set cancels the session on the spot.
    pub async fn leave(
        &self,
        room_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<LeaveOutcome> {
        let emptied = {
            let mut sessions = self.lock()?;
            let session = sessions.get_mut(&room_id).ok_or(Error::NoActiveSession)?;

            if session.members.remove(&user_id).is_none() {
                return Err(Error::NotMember);
            }

            if session.members.is_empty() {
                sessions.remove(&room_id)
            } else {
                return Ok(LeaveOutcome {
                    remaining: session.members.len(),
                    session_ended: false,
                });
            }
        };

        if let Some(session) = emptied {
            info!(room_id, "focus session cancelled, no participants left");
            self.finalize(&session, SessionStatus::Cancelled, now).await;
        }
        Ok(LeaveOutcome {
            remaining: 0,
            session_ended: true,
        })
    }

    /// Snapshot the room's session, if one is live.
    ///
    /// An expired entry observed here is dropped and reported as absent.
    /// This read path deliberately skips stats finalization: completion
    /// credit is only ever recorded by the periodic sweep.
    pub fn status(&self, room_id: i64, now: DateTime<Utc>) -> Result<Option<SessionView>> {
        let mut sessions = self.lock()?;
        match sessions.get(&room_id) {
            None => Ok(None),
            Some(session) if session.is_expired(now) => {
                sessions.remove(&room_id);
                Ok(None)
            }
            Some(session) => Ok(Some(SessionView::of(session, now))),
        }
    }

    /// End the room's session early. Allowed for the creator and for
    /// privileged callers; finalizes as cancelled.
    pub async fn end(
        &self,
        room_id: i64,
        requester_id: i64,
        now: DateTime<Utc>,
        has_privilege: bool,
    ) -> Result<EndOutcome> {
        let session = {
            let mut sessions = self.lock()?;
            let session = sessions.get(&room_id).ok_or(Error::NoActiveSession)?;

            if session.creator.user_id != requester_id && !has_privilege {
                return Err(Error::NotAuthorized);
            }
            sessions.remove(&room_id).ok_or(Error::NoActiveSession)?
        };

        let participant_count = session.members.len();
        info!(room_id, requester_id, participant_count, "focus session ended early");
        self.finalize(&session, SessionStatus::Cancelled, now).await;

        Ok(EndOutcome { participant_count })
    }

    /// Drain every session whose deadline has passed. Used by the expiry
    /// sweep; removal happens under the lock so each drained session has
    /// exactly one owner.
    pub fn take_expired(&self, now: DateTime<Utc>) -> Result<Vec<FocusSession>> {
        let mut sessions = self.lock()?;
        let due: Vec<i64> = sessions
            .iter()
            .filter(|(_, session)| session.is_expired(now))
            .map(|(room_id, _)| *room_id)
            .collect();
        Ok(due
            .into_iter()
            .filter_map(|room_id| sessions.remove(&room_id))
            .collect())
    }

    /// Number of live sessions across all rooms.
    pub fn active_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Persist a session's terminal state. The in-memory entry is already
    /// gone by the time this runs; a store failure is logged and the
    /// removal stands (stats loss over a stuck session).
    pub async fn finalize(
        &self,
        session: &FocusSession,
        status: SessionStatus,
        ended_at: DateTime<Utc>,
    ) {
        let outcome = FinalizedSession::of(session, status, ended_at);
        if let Err(e) = self.store.finalize_session(&outcome).await {
            error!(
                room_id = session.room_id,
                status = status.as_str(),
                error = %e,
                "failed to persist session close-out"
            );
        }
    }
}
