use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionState;

/// Statistics about a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Stream identifier (registry key)
    pub stream_id: String,

    /// Meeting the stream belongs to
    pub meeting_uuid: String,

    /// Current lifecycle state
    pub state: SessionState,

    /// Thread allowed to drive the session, formatted for display
    pub owning_thread: String,

    /// When the poll loop created the session
    pub created_at: DateTime<Utc>,

    /// When the join succeeded, if it has
    pub joined_at: Option<DateTime<Utc>>,

    /// Transcript chunks handed to callbacks
    pub transcripts_delivered: usize,

    /// Audio chunks handed to callbacks
    pub audio_chunks_delivered: usize,

    /// Callback invocations that returned an error
    pub delivery_failures: usize,
}
