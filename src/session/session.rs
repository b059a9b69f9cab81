use super::callbacks::{AudioCallback, TranscriptCallback};
use super::error::SessionError;
use super::handoff::JoinRequest;
use super::stats::SessionStats;
use super::thread::DesignatedThread;
use crate::transport::{AudioData, JoinRejected, StreamTransport, TranscriptData, TransportEvent};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread::ThreadId;
use tracing::{debug, info, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created, join not yet completed
    Pending,
    /// Joined and receiving data
    Active,
    /// Left or closed by the remote side
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Pending => "pending",
            SessionState::Active => "active",
            SessionState::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Result of advancing a session by one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Still streaming
    Open,
    /// The transport closed; the session is now ended
    Closed { reason: String },
}

/// A joined RTMS stream
///
/// Sessions are created by the poll loop and bound to its thread at creation.
/// `join`, `advance` and `terminate` require the poll loop's
/// [`DesignatedThread`] token, so no other thread can drive a session.
pub struct Session {
    /// Join parameters from the start webhook
    request: JoinRequest,

    /// Current lifecycle state
    state: SessionState,

    /// Thread the session was created on
    owning_thread: ThreadId,

    /// When the session was created
    created_at: DateTime<Utc>,

    /// When the join succeeded
    joined_at: Option<DateTime<Utc>>,

    /// Underlying streaming connection
    transport: Box<dyn StreamTransport>,

    transcript_callbacks: Vec<TranscriptCallback>,
    audio_callbacks: Vec<AudioCallback>,

    transcripts_delivered: usize,
    audio_chunks_delivered: usize,
    delivery_failures: usize,
}

impl Session {
    /// Create a pending session bound to the calling thread
    pub fn new(
        request: JoinRequest,
        transport: Box<dyn StreamTransport>,
        thread: &DesignatedThread,
    ) -> Self {
        debug!(
            "Creating session for stream {} on {:?} (transport: {})",
            request.stream_id,
            thread.id(),
            transport.name()
        );

        Self {
            request,
            state: SessionState::Pending,
            owning_thread: thread.id(),
            created_at: Utc::now(),
            joined_at: None,
            transport,
            transcript_callbacks: Vec::new(),
            audio_callbacks: Vec::new(),
            transcripts_delivered: 0,
            audio_chunks_delivered: 0,
            delivery_failures: 0,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.request.stream_id
    }

    pub fn meeting_uuid(&self) -> &str {
        &self.request.meeting_uuid
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn owning_thread(&self) -> ThreadId {
        self.owning_thread
    }

    /// Register a callback for transcript data
    pub fn on_transcript_data<F>(&mut self, callback: F)
    where
        F: FnMut(&TranscriptData) -> Result<()> + Send + 'static,
    {
        self.transcript_callbacks.push(Box::new(callback));
    }

    /// Register a callback for audio data
    pub fn on_audio_data<F>(&mut self, callback: F)
    where
        F: FnMut(&AudioData) -> Result<()> + Send + 'static,
    {
        self.audio_callbacks.push(Box::new(callback));
    }

    /// Join the stream (Pending → Active)
    ///
    /// On failure the session stays pending and should be discarded.
    pub async fn join(&mut self, thread: &DesignatedThread) -> Result<(), SessionError> {
        self.check_owner(thread);

        if self.state != SessionState::Pending {
            return Err(SessionError::InvalidState {
                stream_id: self.request.stream_id.clone(),
                actual: self.state,
                expected: SessionState::Pending,
            });
        }

        info!(
            "Joining stream {} (meeting {})",
            self.request.stream_id, self.request.meeting_uuid
        );

        let stream_id = &self.request.stream_id;
        self.transport
            .join(&self.request)
            .await
            .map_err(|source| match source.downcast::<JoinRejected>() {
                Ok(rejected) => SessionError::JoinRejected {
                    stream_id: stream_id.clone(),
                    reason: rejected.reason,
                },
                Err(source) => SessionError::Transport {
                    stream_id: stream_id.clone(),
                    source,
                },
            })?;

        self.state = SessionState::Active;
        self.joined_at = Some(Utc::now());

        info!("Joined stream {}", self.request.stream_id);

        Ok(())
    }

    /// Deliver buffered data to callbacks and check for transport closure
    ///
    /// A failed poll is treated as a closure of the stream. Callback failures
    /// are logged and counted, never propagated.
    pub async fn advance(&mut self, thread: &DesignatedThread) -> Progress {
        self.check_owner(thread);

        match self.state {
            SessionState::Active => {}
            SessionState::Pending => return Progress::Open,
            SessionState::Ended => {
                return Progress::Closed {
                    reason: "session already ended".to_string(),
                }
            }
        }

        let events = match self.transport.poll().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Polling stream {} failed: {:#}", self.request.stream_id, e);
                vec![TransportEvent::Closed {
                    reason: format!("poll failed: {:#}", e),
                }]
            }
        };

        for event in events {
            match event {
                TransportEvent::Transcript(transcript) => self.deliver_transcript(&transcript),
                TransportEvent::Audio(audio) => self.deliver_audio(&audio),
                TransportEvent::Closed { reason } => {
                    info!("Stream {} closed by transport: {}", self.request.stream_id, reason);
                    self.state = SessionState::Ended;
                    return Progress::Closed { reason };
                }
            }
        }

        Progress::Open
    }

    /// Leave the stream
    ///
    /// Safe to call on an ended session, which is a no-op. The session is
    /// marked ended even if the transport fails to leave cleanly.
    pub async fn terminate(&mut self, thread: &DesignatedThread) -> Result<(), SessionError> {
        self.check_owner(thread);

        if self.state == SessionState::Ended {
            debug!("Stream {} already ended", self.request.stream_id);
            return Ok(());
        }

        info!("Leaving stream {}", self.request.stream_id);
        self.state = SessionState::Ended;

        self.transport
            .leave()
            .await
            .map_err(|source| SessionError::Transport {
                stream_id: self.request.stream_id.clone(),
                source,
            })
    }

    /// Get current session statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            stream_id: self.request.stream_id.clone(),
            meeting_uuid: self.request.meeting_uuid.clone(),
            state: self.state,
            owning_thread: format!("{:?}", self.owning_thread),
            created_at: self.created_at,
            joined_at: self.joined_at,
            transcripts_delivered: self.transcripts_delivered,
            audio_chunks_delivered: self.audio_chunks_delivered,
            delivery_failures: self.delivery_failures,
        }
    }

    fn deliver_transcript(&mut self, transcript: &TranscriptData) {
        debug!(
            "Stream {}: {} byte transcript chunk from {}",
            self.request.stream_id,
            transcript.size(),
            transcript.metadata.user_name
        );
        for callback in self.transcript_callbacks.iter_mut() {
            if let Err(source) = callback(transcript) {
                self.delivery_failures += 1;
                let err = SessionError::Delivery {
                    stream_id: self.request.stream_id.clone(),
                    kind: "Transcript",
                    source,
                };
                warn!("{}", err);
            }
        }
        self.transcripts_delivered += 1;
    }

    fn deliver_audio(&mut self, audio: &AudioData) {
        debug!(
            "Stream {}: {} byte audio chunk from {}",
            self.request.stream_id,
            audio.size(),
            audio.metadata.user_name
        );
        for callback in self.audio_callbacks.iter_mut() {
            if let Err(source) = callback(audio) {
                self.delivery_failures += 1;
                let err = SessionError::Delivery {
                    stream_id: self.request.stream_id.clone(),
                    kind: "Audio",
                    source,
                };
                warn!("{}", err);
            }
        }
        self.audio_chunks_delivered += 1;
    }

    fn check_owner(&self, thread: &DesignatedThread) {
        debug_assert_eq!(
            thread.id(),
            self.owning_thread,
            "stream {} driven from a thread other than its owner",
            self.request.stream_id
        );
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("stream_id", &self.request.stream_id)
            .field("meeting_uuid", &self.request.meeting_uuid)
            .field("state", &self.state)
            .field("owning_thread", &self.owning_thread)
            .field("transport", &self.transport.name())
            .finish()
    }
}
