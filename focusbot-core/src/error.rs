//! Error types for focusbot-core.

use thiserror::Error;

/// Result type alias using focusbot-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for focus session operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors - reported back to the caller as replies, never fatal
    #[error("duration must be between 1 and 480 minutes")]
    InvalidDuration { minutes: i64 },

    #[error("a focus session is already running ({minutes_remaining} minutes remaining)")]
    SessionAlreadyActive { minutes_remaining: i64 },

    #[error("no focus session is currently running")]
    NoActiveSession,

    #[error("the focus session just ended")]
    SessionJustExpired,

    #[error("already participating in the focus session")]
    AlreadyMember,

    #[error("not participating in the focus session")]
    NotMember,

    #[error("only the session creator or a moderator can end the session")]
    NotAuthorized,

    // Persistence errors
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("registry lock poisoned")]
    RegistryPoisoned,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is an expected user-level outcome (bad input,
    /// nothing to act on) rather than a fault in the process or the store.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidDuration { .. }
                | Error::SessionAlreadyActive { .. }
                | Error::NoActiveSession
                | Error::SessionJustExpired
                | Error::AlreadyMember
                | Error::NotMember
                | Error::NotAuthorized
        )
    }
}
