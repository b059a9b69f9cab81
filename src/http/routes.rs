use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Platform notifications
        .route(webhook_path, post(handlers::receive_webhook))
        // Session queries
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/:stream_id", get(handlers::get_session))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
