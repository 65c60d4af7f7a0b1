//! Operational endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;

use crate::context::SyncContext;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub watcher: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub clients: usize,
}

/// Create REST API router.
pub fn create_rest_router(context: Arc<SyncContext>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/api/v1/status", get(status))
        .with_state(context)
}

/// Health check endpoint. Degraded watcher → 503.
async fn health_check(State(context): State<Arc<SyncContext>>) -> impl IntoResponse {
    let health = context.watcher().health();
    let healthy = health.is_healthy() && context.watcher().is_running();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        watcher: if healthy { "ok" } else { "lost" }.to_string(),
        reason: health.reason(),
        clients: context.hub().client_count(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(status = ?status_code, watcher = %response.watcher, "Health check");

    (status_code, Json(response))
}

/// Prometheus metrics endpoint.
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; charset=utf-8",
            )],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    axum::http::header::CONTENT_TYPE,
                    "text/plain; charset=utf-8",
                )],
                b"Failed to encode metrics".to_vec(),
            )
        }
    }
}

/// Status endpoint with pipeline statistics.
async fn status(State(context): State<Arc<SyncContext>>) -> impl IntoResponse {
    let stats = context.watcher().stats().snapshot();

    tracing::debug!(
        raw = stats.raw_events,
        published = stats.published,
        "Status retrieved"
    );

    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "root": context.root().path().display().to_string(),
        "clients": context.hub().client_count(),
        "watcher": stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn create_test_context() -> (TempDir, Arc<SyncContext>) {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            workspace_root: tmp.path().to_path_buf(),
            ..Config::default()
        };
        let context = SyncContext::start(&config).unwrap();
        (tmp, Arc::new(context))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_tmp, context) = create_test_context();
        let (status, body) = get(create_rest_router(context), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["clients"], 0);
    }

    #[tokio::test]
    async fn test_health_check_degraded() {
        let (_tmp, context) = create_test_context();
        context.watcher().health().mark_degraded("observer lost");

        let (status, body) = get(create_rest_router(context), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["reason"], "observer lost");
    }

    #[tokio::test]
    async fn test_metrics() {
        crate::server::metrics::init_metrics();
        let (_tmp, context) = create_test_context();
        let response = create_rest_router(context)
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status() {
        let (_tmp, context) = create_test_context();
        let (status, body) = get(create_rest_router(context), "/api/v1/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["watcher"]["published"], 0);
    }
}
