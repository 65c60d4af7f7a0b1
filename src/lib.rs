//! codespace library
//!
//! Workspace synchronization server: one directory on disk, served over a
//! file API and mirrored live to connected clients.
//!
//! The pipeline runs in one direction:
//! OS notifications → [`watcher`] (filter, correlate, coalesce) → [`hub`] →
//! per-client queues → WebSocket writers in [`server`].

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod hub;
pub mod server;
pub mod watcher;
pub mod workspace;

pub use config::Config;
pub use context::SyncContext;
pub use error::{Error, Result};
