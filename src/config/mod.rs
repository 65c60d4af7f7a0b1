//! Configuration management for codespace.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables (`CODESPACE_*`)
//! - Built-in defaults

mod settings;

pub use settings::Config;
