use crate::session::SessionRegistry;
use crate::webhook::WebhookRouter;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Dispatches inbound webhooks
    pub router: WebhookRouter,

    /// Active sessions (stream_id → session), read-only from HTTP
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(router: WebhookRouter, sessions: SessionRegistry) -> Self {
        Self { router, sessions }
    }
}
