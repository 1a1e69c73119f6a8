//! CLI configuration
//!
//! Layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. `<config_dir>/keel/config.toml`, when present
//! 3. `KEEL_DAEMON_SOCKET`, `KEEL_DAEMON_ADDR` and `KEEL_LOG`
//!
//! ```toml
//! log_level = "debug"
//! color = false
//!
//! [daemon]
//! unix = "/run/keel/daemon.sock"
//! ```

use crate::daemon::DaemonEndpoint;
use crate::error::{KeelError, KeelResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Unix socket path of the daemon
pub const ENV_DAEMON_SOCKET: &str = "KEEL_DAEMON_SOCKET";
/// TCP `host:port` of the daemon; wins over the socket path
pub const ENV_DAEMON_ADDR: &str = "KEEL_DAEMON_ADDR";
/// Log filter directive
pub const ENV_LOG: &str = "KEEL_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeelConfig {
    /// Where the build daemon listens
    pub daemon: DaemonEndpoint,
    /// `tracing` filter directive, `warn` when unset
    pub log_level: Option<String>,
    /// Colorize rendered log output
    pub color: bool,
}

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            daemon: DaemonEndpoint::default(),
            log_level: None,
            color: true,
        }
    }
}

impl KeelConfig {
    /// Load from the user's config file and the process environment
    pub fn load() -> KeelResult<Self> {
        Self::load_from(Self::default_path().as_deref(), |key| std::env::var(key).ok())
    }

    /// Load from an explicit file and environment lookup
    pub fn load_from<F>(path: Option<&Path>, env: F) -> KeelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env);
        Ok(config)
    }

    /// `<config_dir>/keel/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("keel").join("config.toml"))
    }

    /// Read a TOML config file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> KeelResult<Self> {
        if !path.exists() {
            tracing::debug!("no config file at {}", path.display());
            return Ok(Self::default());
        }

        tracing::debug!("loading config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            KeelError::config(format!("failed to read config file '{}': {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            KeelError::config(format!("failed to parse config file '{}': {}", path.display(), e))
        })
    }

    /// Apply environment overrides
    pub fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        if let Some(socket) = non_empty(ENV_DAEMON_SOCKET) {
            self.daemon = DaemonEndpoint::Unix(PathBuf::from(socket));
        }
        if let Some(addr) = non_empty(ENV_DAEMON_ADDR) {
            self.daemon = DaemonEndpoint::Tcp(addr);
        }
        if let Some(level) = non_empty(ENV_LOG) {
            self.log_level = Some(level);
        }
    }

    /// Filter directive for the log subscriber
    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
    }
}
