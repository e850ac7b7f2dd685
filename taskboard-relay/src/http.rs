//! HTTP surface: WebSocket upgrade, health check, and upload echo.
//!
//! The relay is reached by browser clients, so the router carries a
//! permissive CORS layer and request tracing. File uploads carry no storage
//! logic — the endpoint validates the descriptor batch and echoes it back
//! for the client to attach to a task.

use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use taskboard_proto::task::Attachment;

use crate::relay::{self, RelayState};

/// Builds the relay router: `/ws` upgrade plus the JSON API routes.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/health", get(health))
        .route("/api/upload", post(upload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay::handle_socket(socket, state))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    viewers: u32,
    tasks: usize,
    timestamp: DateTime<Utc>,
}

/// Reports viewer count, task count, and the current server time.
async fn health(State(state): State<Arc<RelayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        viewers: state.roster.count().await,
        tasks: state.task_count().await,
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    #[serde(default)]
    files: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    files: Vec<Attachment>,
}

/// Accepts a batch of uploaded-file descriptors and echoes them back.
async fn upload(Json(request): Json<UploadRequest>) -> Json<UploadResponse> {
    Json(UploadResponse {
        success: true,
        files: request.files,
    })
}
