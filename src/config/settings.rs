//! Configuration settings and validation.

use crate::workspace::WorkspaceRoot;
use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted throttle or dedup window.
const MAX_WINDOW_MS: u64 = 60_000;

/// Largest accepted per-client queue.
const MAX_CLIENT_BUFFER: usize = 65_536;

/// Main configuration for the codespace server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory served and watched.
    pub workspace_root: PathBuf,

    /// Host address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Per-path throttle window in milliseconds (0 disables).
    pub throttle_ms: u64,

    /// Logical dedup window in milliseconds (0 disables).
    pub dedup_ms: u64,

    /// Per-client outbound queue capacity.
    pub client_buffer: usize,

    /// Limit on a single command's run time, in seconds.
    pub command_timeout_secs: u64,

    /// Extra gitignore-style patterns hidden from clients.
    pub ignore_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("./codespace"),
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            throttle_ms: 1000,
            dedup_ms: 1000,
            client_buffer: crate::hub::DEFAULT_CLIENT_BUFFER,
            command_timeout_secs: crate::hub::DEFAULT_COMMAND_TIMEOUT.as_secs(),
            ignore_patterns: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("port cannot be 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.host.is_empty() {
            return Err(Error::config("host cannot be empty"));
        }

        if self.throttle_ms > MAX_WINDOW_MS || self.dedup_ms > MAX_WINDOW_MS {
            return Err(Error::config(format!(
                "throttle and dedup windows cannot exceed {MAX_WINDOW_MS} ms"
            )));
        }

        if self.client_buffer == 0 || self.client_buffer > MAX_CLIENT_BUFFER {
            return Err(Error::config(format!(
                "client_buffer must be between 1 and {MAX_CLIENT_BUFFER}"
            )));
        }

        if self.command_timeout_secs == 0 {
            return Err(Error::config("command_timeout_secs cannot be 0"));
        }

        Ok(())
    }

    /// Create the workspace root if needed and resolve it.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or is not a directory.
    pub fn ensure_workspace_root(&self) -> Result<WorkspaceRoot> {
        WorkspaceRoot::open(&self.workspace_root).map_err(|e| {
            Error::config(format!(
                "workspace root '{}' unusable: {e}",
                self.workspace_root.display()
            ))
        })
    }

    /// Get the server address as a string.
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub const fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    #[must_use]
    pub const fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_ms)
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
