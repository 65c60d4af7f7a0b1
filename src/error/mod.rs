//! Error types and Result aliases for codespace.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`, except the
//! workspace store, which returns [`WorkspaceError`] directly so the HTTP layer
//! can map each failure class to a status code.

use std::path::Path;

use thiserror::Error;

/// Result type alias using codespace's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for codespace operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Workspace store error.
    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Server/API error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Workspace store errors.
///
/// `InvalidPath` and `InvalidName` are validation failures raised before any
/// disk access. `Io` carries the underlying message and is never retried.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Path is malformed or resolves outside the workspace root.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Entry name is empty or not a single path segment.
    #[error("invalid name '{0}'")]
    InvalidName(String),

    /// Path does not exist (or is not the expected kind of entry).
    #[error("not found: {0}")]
    NotFound(String),

    /// Path exists but is a file where a directory was required.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Target of a rename already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Underlying filesystem failure.
    #[error("I/O failure on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to establish the observer.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Observer was lost after startup.
    #[error("watcher lost: {0}")]
    Lost(String),
}

/// Server/API errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Request handling error.
    #[error("request error: {0}")]
    Request(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl WorkspaceError {
    /// Create an invalid-path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether this error was raised by validation, before any disk access.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidPath { .. } | Self::InvalidName(_))
    }
}
