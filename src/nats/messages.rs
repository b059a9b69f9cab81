use serde::{Deserialize, Serialize};

/// Join request sent to the stream gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinMessage {
    pub request_id: String,
    pub meeting_uuid: String,
    pub rtms_stream_id: String,
    pub server_urls: String,
    pub signature: String,
    pub timestamp: String, // RFC3339 timestamp
}

/// Gateway reply to a join request
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinReply {
    pub accepted: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Published when leaving a stream
#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveMessage {
    pub meeting_uuid: String,
    pub rtms_stream_id: String,
    pub timestamp: String, // RFC3339 timestamp
}

/// Transcript or audio chunk received from the gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct DataMessage {
    pub data: String, // Base64-encoded bytes
    pub timestamp: u64,
    pub user_name: String,
    #[serde(default)]
    pub user_id: u32,
}

/// Sent by the gateway when the stream ends on its side
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClosedMessage {
    #[serde(default)]
    pub reason: Option<String>,
}
