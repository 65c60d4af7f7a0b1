//! Main application server.
//!
//! Provides the complete server application with signal handling
//! and graceful shutdown coordination.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::files::create_files_router;
use super::rest::create_rest_router;
use super::socket::create_socket_router;
use crate::context::SyncContext;
use crate::Result;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Application server.
pub struct App {
    config: ServerConfig,
    context: Arc<SyncContext>,
}

impl App {
    /// Create a new application over a started sync context.
    #[must_use]
    pub fn new(config: ServerConfig, context: Arc<SyncContext>) -> Self {
        Self { config, context }
    }

    /// Build the router with all endpoints.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(create_files_router(self.context.store().clone()))
            .merge(create_socket_router(Arc::clone(&self.context)))
            .merge(create_rest_router(Arc::clone(&self.context)))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &axum::http::Request<_>| {
                        let method = request.method();
                        let uri = request.uri();
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");

                        tracing::info_span!(
                            "http_request",
                            method = %method,
                            uri = %uri,
                            request_id = %request_id,
                        )
                    })
                    .on_response(
                        |response: &axum::response::Response,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::debug!(
                                status = %response.status(),
                                latency_ms = latency.as_millis(),
                                "Request completed"
                            );
                        },
                    ),
            )
            .layer(cors)
    }

    /// Run the server until shutdown signal, then stop the watcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot start or encounters
    /// a fatal error during execution.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| crate::Error::config(format!("invalid address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            crate::error::ServerError::BindFailed {
                address: addr.to_string(),
                reason: e.to_string(),
            }
        })?;

        tracing::info!(%addr, "Server listening");

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::error::ServerError::Request(e.to_string()));

        self.context.stop();
        served?;

        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
