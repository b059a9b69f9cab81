use thiserror::Error;

use super::SessionState;

/// Failures of a single session's lifecycle operations
///
/// None of these are fatal to the poll loop; callers log them and move on.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The gateway refused to let the session join the stream.
    #[error("Join rejected for stream {stream_id}: {reason}")]
    JoinRejected { stream_id: String, reason: String },

    /// The transport failed the operation.
    #[error("Transport error on stream {stream_id}: {source:#}")]
    Transport {
        stream_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// A data callback returned an error.
    #[error("{kind} callback failed for stream {stream_id}: {source:#}")]
    Delivery {
        stream_id: String,
        kind: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The operation is not valid in the session's current state.
    #[error("Stream {stream_id} is {actual}, expected {expected}")]
    InvalidState {
        stream_id: String,
        actual: SessionState,
        expected: SessionState,
    },
}
