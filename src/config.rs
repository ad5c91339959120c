//! Server configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::services::executor::ExecTimeouts;
use crate::services::registry::EvictionPolicy;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_EXEC_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EXEC_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_ROOM_REAP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPort(_) => "E_CONFIG_PORT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub run_url: Option<String>,
    pub analyze_url: Option<String>,
    pub exec_timeouts: ExecTimeouts,
    pub eviction: EvictionPolicy,
    pub reap_interval: Duration,
    pub queue_capacity: usize,
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Build typed server config from the process environment.
    ///
    /// - `PORT`: default 3000
    /// - `RUN_URL` / `ANALYZE_URL`: code runner upstreams, unset disables
    /// - `EXEC_REQUEST_TIMEOUT_SECS`: default 30
    /// - `EXEC_CONNECT_TIMEOUT_SECS`: default 5
    /// - `ROOM_IDLE_TIMEOUT_SECS`: unset or 0 keeps rooms forever
    /// - `ROOM_REAP_INTERVAL_SECS`: default 60
    /// - `CLIENT_QUEUE_CAPACITY`: default 256
    /// - `STATIC_DIR`: serve the browser client from this directory
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPort` if `PORT` is set but not a port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPort` if `PORT` is set but not a port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match non_empty(lookup("PORT")) {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
        };

        let eviction = match parse_or(&lookup, "ROOM_IDLE_TIMEOUT_SECS", 0u64) {
            0 => EvictionPolicy::Never,
            secs => EvictionPolicy::IdleAfter(Duration::from_secs(secs)),
        };

        Ok(Self {
            port,
            run_url: non_empty(lookup("RUN_URL")),
            analyze_url: non_empty(lookup("ANALYZE_URL")),
            exec_timeouts: ExecTimeouts {
                request_secs: parse_or(&lookup, "EXEC_REQUEST_TIMEOUT_SECS", DEFAULT_EXEC_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_or(&lookup, "EXEC_CONNECT_TIMEOUT_SECS", DEFAULT_EXEC_CONNECT_TIMEOUT_SECS),
            },
            eviction,
            reap_interval: Duration::from_secs(parse_or(
                &lookup,
                "ROOM_REAP_INTERVAL_SECS",
                DEFAULT_ROOM_REAP_INTERVAL_SECS,
            )),
            queue_capacity: parse_or(&lookup, "CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY).max(1),
            static_dir: non_empty(lookup("STATIC_DIR")).map(PathBuf::from),
        })
    }

    /// Whether any code runner upstream is configured.
    #[must_use]
    pub fn has_executor(&self) -> bool {
        self.run_url.is_some() || self.analyze_url.is_some()
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
