use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::session::JoinRequest;

/// Event name sent when a meeting starts streaming
pub const RTMS_STARTED: &str = "meeting.rtms_started";

/// Event name sent when a meeting stops streaming
pub const RTMS_STOPPED: &str = "meeting.rtms_stopped";

/// Classification of an inbound webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Started,
    Stopped,
    Unknown,
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            RTMS_STARTED => EventKind::Started,
            RTMS_STOPPED => EventKind::Stopped,
            _ => EventKind::Unknown,
        }
    }
}

/// A parsed webhook notification
///
/// Parsing never fails: anything malformed becomes an `Unknown` event, which
/// the router ignores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub kind: EventKind,
    /// The raw `event` field, kept for logging
    pub event_name: Option<String>,
    /// `None` when missing or empty
    pub stream_id: Option<String>,
    pub meeting_uuid: String,
    pub server_urls: String,
    pub signature: String,
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawWebhook {
    event: Option<String>,
    payload: Option<RawPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    rtms_stream_id: Option<String>,
    meeting_uuid: Option<String>,
    server_urls: Option<String>,
    signature: Option<String>,
}

impl WebhookEvent {
    /// An event carrying nothing the router can act on
    pub fn unknown() -> Self {
        Self {
            kind: EventKind::Unknown,
            event_name: None,
            stream_id: None,
            meeting_uuid: String::new(),
            server_urls: String::new(),
            signature: String::new(),
        }
    }

    /// Parse a webhook body
    pub fn from_slice(body: &[u8]) -> Self {
        match serde_json::from_slice::<RawWebhook>(body) {
            Ok(raw) => Self::from_raw(raw),
            Err(e) => {
                warn!("Malformed webhook body: {}", e);
                Self::unknown()
            }
        }
    }

    /// Parse an already decoded JSON document
    pub fn from_json(value: serde_json::Value) -> Self {
        match serde_json::from_value::<RawWebhook>(value) {
            Ok(raw) => Self::from_raw(raw),
            Err(e) => {
                warn!("Malformed webhook payload: {}", e);
                Self::unknown()
            }
        }
    }

    fn from_raw(raw: RawWebhook) -> Self {
        let payload = raw.payload.unwrap_or_default();
        let kind = raw
            .event
            .as_deref()
            .map(EventKind::from_name)
            .unwrap_or(EventKind::Unknown);

        Self {
            kind,
            event_name: raw.event,
            stream_id: payload.rtms_stream_id.filter(|id| !id.is_empty()),
            meeting_uuid: payload.meeting_uuid.unwrap_or_default(),
            server_urls: payload.server_urls.unwrap_or_default(),
            signature: payload.signature.unwrap_or_default(),
        }
    }

    /// Join parameters for a start event, if it names a stream
    pub fn join_request(&self) -> Option<JoinRequest> {
        let stream_id = self.stream_id.clone()?;
        Some(JoinRequest {
            stream_id,
            meeting_uuid: self.meeting_uuid.clone(),
            server_urls: self.server_urls.clone(),
            signature: self.signature.clone(),
        })
    }
}
