//! Periodic expiry sweep.
//!
//! A fixed-interval task that drains due sessions from the registry,
//! finalizes each as completed, and emits a notification event per room.
//! One room's failure never aborts the rest of the sweep, and a session is
//! always removed even when its stats write fails.

use crate::clock::Clock;
use crate::registry::SessionRegistry;
use crate::types::SessionStatus;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

/// Outbound notification for the messaging layer. Fire-and-forget: nobody
/// waits for delivery and nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Ended { room_id: i64 },
}

/// Periodic sweep over the session registry.
pub struct ExpiryScheduler {
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    period: Duration,
    events: UnboundedSender<SessionEvent>,
}

impl ExpiryScheduler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
        period: Duration,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            registry,
            clock,
            period,
            events,
        }
    }

    /// Spawn the sweep loop. The returned handle stops it on shutdown.
    pub fn start(self) -> AbortHandle {
        info!(period_secs = self.period.as_secs(), "starting expiry sweep");
        let handle = tokio::spawn(async move {
            let mut tick = interval(self.period);
            loop {
                tick.tick().await;
                let now = self.clock.now();
                let swept = self.sweep(now).await;
                if swept > 0 {
                    debug!(swept, "expiry sweep finalized sessions");
                }
            }
        });
        handle.abort_handle()
    }

    /// One sweep pass: finalize every session due at `now`. Returns the
    /// number of sessions finalized.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let expired = match self.registry.take_expired(now) {
            Ok(expired) => expired,
            Err(e) => {
                error!(error = %e, "expiry sweep could not read the registry");
                return 0;
            }
        };

        let count = expired.len();
        for session in expired {
            let room_id = session.room_id;
            let participants = session.members.len();

            // finalize logs its own store failures; the session is gone
            // from the registry either way
            self.registry
                .finalize(&session, SessionStatus::Completed, now)
                .await;
            info!(room_id, participants, "focus session completed");

            // Receiver may be gone during shutdown; delivery is best-effort.
            let _ = self.events.send(SessionEvent::Ended { room_id });
        }
        count
    }
}
