use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::JoinRequest;

/// Participant metadata attached to every data chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Display name of the speaking participant
    pub user_name: String,
    /// Platform-assigned participant ID
    pub user_id: u32,
}

/// A chunk of transcript text as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptData {
    /// Raw transcript bytes (expected to be UTF-8)
    pub data: Vec<u8>,
    /// Platform timestamp for this chunk
    pub timestamp: u64,
    /// Who said it
    pub metadata: StreamMetadata,
}

impl TranscriptData {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A chunk of raw audio as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioData {
    /// Encoded audio bytes; the transport does not interpret them
    pub data: Vec<u8>,
    /// Platform timestamp for this chunk
    pub timestamp: u64,
    /// Which participant the audio belongs to
    pub metadata: StreamMetadata,
}

impl AudioData {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Something the transport buffered since the previous poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Transcript(TranscriptData),
    Audio(AudioData),
    /// The remote side closed the stream; nothing follows this event
    Closed { reason: String },
}

/// The remote side refused a join
///
/// Transports return this (inside `anyhow::Error`) so the session can report
/// a refusal separately from a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Join rejected: {reason}")]
pub struct JoinRejected {
    pub reason: String,
}

/// Streaming connection for a single RTMS stream
///
/// Implementations are driven exclusively from the poll loop thread:
/// - `join` once, right after creation
/// - `poll` once per tick, returning whatever is buffered without waiting
/// - `leave` at most once, when the stream is stopped or the process exits
#[async_trait::async_trait]
pub trait StreamTransport: Send {
    /// Join the stream described by the webhook payload
    async fn join(&mut self, request: &JoinRequest) -> Result<()>;

    /// Drain buffered data without blocking
    async fn poll(&mut self) -> Result<Vec<TransportEvent>>;

    /// Leave the stream
    async fn leave(&mut self) -> Result<()>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

/// Creates a transport for every session the poll loop sets up
#[async_trait::async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self, stream_id: &str) -> Result<Box<dyn StreamTransport>>;

    /// Push out anything the factory's connections still buffer
    ///
    /// Called once by the poll loop after its final leaves, before its
    /// runtime is dropped.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
