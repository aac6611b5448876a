//! Outbound session notifications.
//!
//! The expiry sweep emits one event per finished session; a consumer task
//! renders the announcement and hands it to a [`MessageSink`]. Delivery is
//! fire-and-forget: a sink failure is logged and dropped, never retried,
//! and never reaches the registry.

use async_trait::async_trait;
use focusbot_core::SessionEvent;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Where rendered announcements go. The production deployment plugs the
/// chat-platform adapter in here.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, room_id: i64, message: &str) -> anyhow::Result<()>;
}

/// Default sink: announce through the log. Stands in until a chat-platform
/// adapter is wired up.
pub struct LogSink;

#[async_trait]
impl MessageSink for LogSink {
    async fn deliver(&self, room_id: i64, message: &str) -> anyhow::Result<()> {
        info!(room_id, message, "session announcement");
        Ok(())
    }
}

const SESSION_OVER: &str = "⏰ The focus session is over! Well done everyone 🎉";

/// Spawn the consumer draining `events` into `sink`.
pub fn spawn_notifier(
    mut events: UnboundedReceiver<SessionEvent>,
    sink: Arc<dyn MessageSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Ended { room_id } => {
                    if let Err(e) = sink.deliver(room_id, SESSION_OVER).await {
                        warn!(room_id, error = %e, "dropping undeliverable session announcement");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct RecordingSink {
        delivered: Mutex<Vec<(i64, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn deliver(&self, room_id: i64, message: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("channel unavailable");
            }
            self.delivered
                .lock()
                .unwrap()
                .push((room_id, message.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_notifier_delivers_announcements() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink {
            delivered: Mutex::new(Vec::new()),
            fail: false,
        });
        let handle = spawn_notifier(rx, sink.clone());

        tx.send(SessionEvent::Ended { room_id: 7 }).unwrap();
        tx.send(SessionEvent::Ended { room_id: 9 }).unwrap();
        drop(tx);
        handle.await.unwrap();

        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].0, 7);
        assert_eq!(delivered[1].0, 9);
        assert!(delivered[0].1.contains("focus session is over"));
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink {
            delivered: Mutex::new(Vec::new()),
            fail: true,
        });
        let handle = spawn_notifier(rx, sink.clone());

        tx.send(SessionEvent::Ended { room_id: 7 }).unwrap();
        drop(tx);
        // consumer survives the failure and drains to completion
        handle.await.unwrap();
        assert!(sink.delivered.lock().unwrap().is_empty());
    }
}
