use super::state::AppState;
use crate::session::SessionStats;
use crate::webhook::{RouteOutcome, WebhookEvent};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::debug;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub outcome: RouteOutcome,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST <webhook path>
/// Receive a platform notification
///
/// Always answers 200: the platform has nothing useful to do with an error,
/// and malformed bodies are routed as unknown events.
pub async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    debug!("Received webhook ({} bytes)", body.len());

    let event = WebhookEvent::from_slice(&body);
    let outcome = state.router.handle(event).await;

    (StatusCode::OK, Json(WebhookResponse { outcome }))
}

/// GET /sessions
/// List registered sessions
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let mut stats: Vec<SessionStats> = Vec::new();
    for (_, session) in state.sessions.snapshot().await {
        stats.push(session.lock().await.stats());
    }
    stats.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));

    (StatusCode::OK, Json(stats))
}

/// GET /sessions/:stream_id
/// Get status of a single session
pub async fn get_session(
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.get(&stream_id).await {
        Some(session) => {
            let stats = session.lock().await.stats();
            (StatusCode::OK, Json(stats)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Stream {} not found", stream_id),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
