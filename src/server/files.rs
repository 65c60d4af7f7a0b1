//! Workspace file API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::WorkspaceError;
use crate::workspace::WorkspaceStore;

type ApiResult = std::result::Result<Json<serde_json::Value>, WorkspaceError>;

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
struct TreeQuery {
    #[serde(default)]
    path: String,
    max_depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct WriteRequest {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    #[serde(default)]
    path: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_dir: bool,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct RenameRequest {
    #[serde(default)]
    new_name: String,
}

/// Create the workspace file router.
pub fn create_files_router(store: WorkspaceStore) -> Router {
    Router::new()
        .route("/api/files", get(list_files).post(create_entry))
        .route(
            "/api/files/{*path}",
            get(read_file)
                .put(write_file)
                .delete(delete_entry)
                .patch(rename_entry),
        )
        .route("/api/tree", get(tree))
        .with_state(store)
}

async fn list_files(State(store): State<WorkspaceStore>, Query(q): Query<ListQuery>) -> ApiResult {
    let files = store.list(&q.path)?;
    Ok(Json(json!({ "files": files })))
}

async fn tree(State(store): State<WorkspaceStore>, Query(q): Query<TreeQuery>) -> ApiResult {
    let files = store.tree(&q.path, q.max_depth)?;
    Ok(Json(json!({ "files": files })))
}

async fn read_file(State(store): State<WorkspaceStore>, Path(path): Path<String>) -> ApiResult {
    let content = store.read(&path)?;
    Ok(Json(json!({ "content": content })))
}

async fn write_file(
    State(store): State<WorkspaceStore>,
    Path(path): Path<String>,
    Json(body): Json<WriteRequest>,
) -> ApiResult {
    store.write(&path, &body.content)?;
    tracing::debug!(path = %path, bytes = body.content.len(), "File written");
    Ok(success())
}

async fn create_entry(
    State(store): State<WorkspaceStore>,
    Json(body): Json<CreateRequest>,
) -> ApiResult {
    store.create(&body.path, &body.name, body.is_dir, &body.content)?;
    tracing::debug!(parent = %body.path, name = %body.name, is_dir = body.is_dir, "Entry created");
    Ok(success())
}

async fn delete_entry(State(store): State<WorkspaceStore>, Path(path): Path<String>) -> ApiResult {
    store.delete(&path)?;
    tracing::debug!(path = %path, "Entry deleted");
    Ok(success())
}

async fn rename_entry(
    State(store): State<WorkspaceStore>,
    Path(path): Path<String>,
    Json(body): Json<RenameRequest>,
) -> ApiResult {
    store.rename(&path, &body.new_name)?;
    tracing::debug!(path = %path, new_name = %body.new_name, "Entry renamed");
    Ok(success())
}

fn success() -> Json<serde_json::Value> {
    Json(json!({ "success": true }))
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> Response {
        if self.is_validation() {
            tracing::debug!(error = %self, "Rejected workspace request");
        }

        let status = match &self {
            Self::InvalidPath { .. } | Self::InvalidName(_) | Self::NotADirectory(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Io { .. } => {
                tracing::warn!(error = %self, "Workspace I/O failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
