use serde::Serialize;
use tracing::{info, warn};

use super::event::{EventKind, WebhookEvent};
use crate::session::{Handoff, HandoffQueue, SessionRegistry};

/// What the router did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteOutcome {
    /// A join request was queued for the poll loop
    JoinQueued,
    /// The session was removed and queued for termination
    Stopping,
    /// The event did not carry a stream ID
    MissingStreamId,
    /// No session is registered under the stream ID
    UnknownStream,
    /// Not an event the router handles
    Ignored,
}

/// Dispatches webhook events to the handoff queue and the session registry
///
/// Safe to call from any thread. It never creates or drives a session itself;
/// joins and leaves are handed to the poll loop thread.
#[derive(Clone)]
pub struct WebhookRouter {
    registry: SessionRegistry,
    queue: HandoffQueue,
}

impl WebhookRouter {
    pub fn new(registry: SessionRegistry, queue: HandoffQueue) -> Self {
        Self { registry, queue }
    }

    pub async fn handle(&self, event: WebhookEvent) -> RouteOutcome {
        match event.kind {
            EventKind::Stopped => self.handle_stopped(event).await,
            EventKind::Started => self.handle_started(event),
            EventKind::Unknown => {
                info!(
                    "Ignoring unknown event: {}",
                    event.event_name.as_deref().unwrap_or("<none>")
                );
                RouteOutcome::Ignored
            }
        }
    }

    async fn handle_stopped(&self, event: WebhookEvent) -> RouteOutcome {
        let Some(stream_id) = event.stream_id else {
            warn!("Received meeting.rtms_stopped event without stream ID");
            return RouteOutcome::MissingStreamId;
        };

        let Some(session) = self.registry.remove(&stream_id).await else {
            warn!(
                "Received meeting.rtms_stopped event for unknown stream ID: {}",
                stream_id
            );
            self.queue.record_unmatched_stop(&stream_id);
            if self.queue.contains_join(&stream_id) {
                warn!(
                    "Stream {} stopped before its pending join was processed; the join will be orphaned",
                    stream_id
                );
            }
            return RouteOutcome::UnknownStream;
        };

        info!("Stopping stream {}", stream_id);
        self.queue.enqueue(Handoff::Leave { stream_id, session });

        RouteOutcome::Stopping
    }

    fn handle_started(&self, event: WebhookEvent) -> RouteOutcome {
        let Some(request) = event.join_request() else {
            warn!("Received meeting.rtms_started event without stream ID");
            return RouteOutcome::MissingStreamId;
        };

        info!(
            "Queueing join for stream {} (meeting {})",
            request.stream_id, request.meeting_uuid
        );
        self.queue.enqueue(Handoff::Join(request));

        RouteOutcome::JoinQueued
    }
}
