//! HTTP surface: the run status document and log artifact retrieval.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use stevedore_core::{StatusBoard, StatusSnapshot};
use stevedore_logs::{LogStore, LogStoreError};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared state for the status routes.
pub struct AppState {
    pub board: Arc<StatusBoard>,
    pub logs: Arc<LogStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/logs/{id}", get(get_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.board.snapshot())
}

/// Raw artifact bytes as text. Unknown or malformed identifiers are a
/// plain-text 404; there is no structured error envelope on this
/// endpoint.
async fn get_log(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.logs.read(&id).await {
        Ok(content) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            content,
        )
            .into_response(),
        Err(e @ (LogStoreError::NotFound(_) | LogStoreError::InvalidId(_))) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e) => {
            warn!(id = %id, error = %e, "failed to read log artifact");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
