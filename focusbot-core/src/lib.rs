//! focusbot-core - Core library for FocusBot
//!
//! This crate holds the parts of FocusBot with real invariants:
//!
//! - **registry**: in-memory registry of per-room focus sessions
//! - **scheduler**: periodic sweep that finalizes expired sessions
//! - **store**: durable per-user statistics and session records (SQLite)
//! - **clock**: time source and display-timezone formatting
//!
//! Chat-platform dispatch, command parsing, and process wiring live in
//! `focusbot-server`.

pub mod clock;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use registry::SessionRegistry;
pub use scheduler::{ExpiryScheduler, SessionEvent};
pub use store::{SqliteStore, StatsStore};
pub use types::{FocusSession, Participant, SessionStatus};
