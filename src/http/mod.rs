//! HTTP API server for the meeting platform and operators
//!
//! This module provides:
//! - POST <webhook path> - Receive RTMS start/stop notifications
//! - GET /sessions - List active sessions
//! - GET /sessions/:stream_id - Query a single session
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
