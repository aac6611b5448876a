//! Server configuration.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (FOCUSBOT_*)
//! 2. Config file (~/.focusbot/focusbot.toml)
//! 3. Default values

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for FocusBot data
    pub data_dir: PathBuf,
    /// Database path
    pub database_path: PathBuf,
    /// PID file path
    pub pid_file: PathBuf,
    /// Loopback address the command API listens on
    pub bind_addr: String,
    /// Expiry sweep period in seconds
    pub sweep_interval_secs: u64,
    /// Prefix commands start with, e.g. "/" for "/startfocus"
    pub command_prefix: String,
    /// Timezone used when rendering wall-clock times
    pub display_timezone: Tz,
}

/// Optional overrides read from focusbot.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<String>,
    database_path: Option<PathBuf>,
    sweep_interval_secs: Option<u64>,
    command_prefix: Option<String>,
    display_timezone: Option<String>,
}

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7470";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_COMMAND_PREFIX: &str = "/";
const DEFAULT_DISPLAY_TIMEZONE: &str = "Europe/Paris";

impl Config {
    /// Load configuration from file, environment and defaults.
    ///
    /// Directory layout:
    /// ```text
    /// ~/.focusbot/
    /// ├── focusbot.toml         # Optional overrides
    /// ├── stats.db              # SQLite database
    /// └── server.pid            # PID file
    /// ```
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        // Use FOCUSBOT_DIR env var if set, otherwise ~/.focusbot
        let data_dir = std::env::var("FOCUSBOT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".focusbot"));

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data dir {}", data_dir.display()))?;

        let file = Self::read_file(&data_dir.join("focusbot.toml"))?;

        let bind_addr = env_or("FOCUSBOT_BIND_ADDR", file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let database_path = std::env::var("FOCUSBOT_DATABASE_PATH")
            .map(PathBuf::from)
            .ok()
            .or(file.database_path)
            .unwrap_or_else(|| data_dir.join("stats.db"));

        let sweep_interval_secs = match std::env::var("FOCUSBOT_SWEEP_INTERVAL_SECS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid FOCUSBOT_SWEEP_INTERVAL_SECS: {raw}"))?,
            Err(_) => file
                .sweep_interval_secs
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        };
        if sweep_interval_secs == 0 {
            bail!("sweep interval must be at least one second");
        }

        let command_prefix = env_or("FOCUSBOT_COMMAND_PREFIX", file.command_prefix)
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());

        let tz_name = env_or("FOCUSBOT_TIMEZONE", file.display_timezone)
            .unwrap_or_else(|| DEFAULT_DISPLAY_TIMEZONE.to_string());
        let display_timezone: Tz = tz_name
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown timezone: {tz_name}"))?;

        Ok(Self {
            pid_file: data_dir.join("server.pid"),
            data_dir,
            database_path,
            bind_addr,
            sweep_interval_secs,
            command_prefix,
            display_timezone,
        })
    }

    fn read_file(path: &PathBuf) -> Result<FileConfig> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

fn env_or(key: &str, fallback: Option<String>) -> Option<String> {
    std::env::var(key).ok().or(fallback)
}
