//! Runtime configuration read from the environment

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_SECS_PER_ROUND: u32 = 90;
const DEFAULT_SESSION_TTL_MINUTES: u64 = 180;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    /// SQLite database file (None = in-memory store, lost on restart)
    pub database_path: Option<PathBuf>,
    /// Round timer for games that don't pick their own
    pub default_secs_per_round: u32,
    /// How long a session token stays valid
    pub session_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            database_path: None,
            default_secs_per_round: DEFAULT_SECS_PER_ROUND,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_MINUTES * 60),
        }
    }
}

impl AppConfig {
    /// Load config from environment variables
    ///
    /// - BIND_ADDR: listen address (default 0.0.0.0:8000)
    /// - DATABASE_PATH: SQLite file; unset keeps everything in memory
    /// - DEFAULT_SECS_PER_ROUND: positive integer (default 90)
    /// - SESSION_TTL_MINUTES: positive integer (default 180)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = parse_var("BIND_ADDR", DEFAULT_BIND_ADDR, |_: &SocketAddr| true)
            .unwrap_or(defaults.bind_addr);

        let database_path = std::env::var("DATABASE_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        match &database_path {
            Some(path) => tracing::info!("Using SQLite database at {}", path.display()),
            None => tracing::warn!("DATABASE_PATH not set - games are kept in memory only"),
        }

        let default_secs_per_round = parse_var(
            "DEFAULT_SECS_PER_ROUND",
            &DEFAULT_SECS_PER_ROUND.to_string(),
            |v: &u32| *v > 0,
        )
        .unwrap_or(defaults.default_secs_per_round);

        let session_ttl = parse_var(
            "SESSION_TTL_MINUTES",
            &DEFAULT_SESSION_TTL_MINUTES.to_string(),
            |v: &u64| *v > 0,
        )
        .map(|minutes| Duration::from_secs(minutes * 60))
        .unwrap_or(defaults.session_ttl);

        Self {
            bind_addr,
            database_path,
            default_secs_per_round,
            session_ttl,
        }
    }
}

/// Read and parse `key`. Missing keys yield None silently; bad values warn.
fn parse_var<T: FromStr>(key: &str, default: &str, valid: impl Fn(&T) -> bool) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse::<T>() {
        Ok(value) if valid(&value) => Some(value),
        _ => {
            tracing::warn!("Invalid {}={:?}, using default {}", key, raw, default);
            None
        }
    }
}
