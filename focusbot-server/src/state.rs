//! Application state.

use focusbot_core::{Clock, SessionRegistry, SqliteStore, SystemClock};
use std::sync::Arc;
use std::time::Instant;

use crate::commands::CommandHandler;
use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Statistics store
    pub store: Arc<SqliteStore>,
    /// Live session registry
    pub registry: Arc<SessionRegistry>,
    /// Command dispatcher
    pub commands: Arc<CommandHandler>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, store: SqliteStore) -> Arc<Self> {
        let config = Arc::new(config);
        let store = Arc::new(store);
        let registry = Arc::new(SessionRegistry::new(store.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let commands = Arc::new(CommandHandler::new(
            registry.clone(),
            store.clone(),
            clock.clone(),
            config.display_timezone,
            config.command_prefix.clone(),
        ));
        Arc::new(Self {
            config,
            store,
            registry,
            commands,
            clock,
            start_time: Instant::now(),
        })
    }
}
