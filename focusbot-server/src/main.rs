//! focusbot-server - FocusBot backend
//!
//! Hosts the session registry and expiry sweep, exposes the command
//! ingestion API to the external messaging layer, and announces finished
//! sessions through the notification sink.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod notify;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("focusbot_server=info".parse()?))
        .init();

    info!("focusbot-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = config::Config::load()?;
    info!("Data directory {:?}", config.data_dir);

    // Check for existing server
    if config.pid_file.exists() {
        let pid_str = std::fs::read_to_string(&config.pid_file)?;
        if let Ok(pid) = pid_str.trim().parse::<i32>() {
            if process_exists(pid) {
                anyhow::bail!("Server already running with PID {}", pid);
            }
        }

        // Clean up stale files
        info!("Cleaning up stale PID file from previous crash");
        let _ = std::fs::remove_file(&config.pid_file);
    }
    std::fs::write(&config.pid_file, std::process::id().to_string())?;

    // Open the store and build shared state
    let store = focusbot_core::SqliteStore::open(&config.database_path)?;
    info!("Database ready at {:?}", config.database_path);
    let state = state::AppState::new(config, store);

    // Expiry sweep feeding the notification pipeline
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let sweep = focusbot_core::ExpiryScheduler::new(
        state.registry.clone(),
        state.clock.clone(),
        std::time::Duration::from_secs(state.config.sweep_interval_secs),
        events_tx,
    )
    .start();
    let notifier = notify::spawn_notifier(events_rx, Arc::new(notify::LogSink));

    // Serve the command API
    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    info!("Listening on {}", state.config.bind_addr);
    let pid_file = state.config.pid_file.clone();
    let router = routes::create_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    sweep.abort();
    notifier.abort();
    let _ = std::fs::remove_file(&pid_file);

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Check if a process exists by PID
fn process_exists(pid: i32) -> bool {
    // On Unix, sending signal 0 checks if process exists
    unsafe { libc::kill(pid, 0) == 0 }
}
