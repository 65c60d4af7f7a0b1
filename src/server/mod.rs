//! HTTP and WebSocket surfaces.
//!
//! This module provides:
//! - Workspace file API using axum
//! - The persistent client channel over WebSocket
//! - Health, status and metrics endpoints

mod app;
mod files;
pub mod metrics;
mod observability;
mod rest;
mod socket;

pub use app::{App, ServerConfig};
pub use files::create_files_router;
pub use metrics::init_metrics;
pub use observability::{init_tracing, spans};
pub use rest::{create_rest_router, HealthResponse};
pub use socket::create_socket_router;
