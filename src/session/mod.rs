//! Streaming session management
//!
//! This module provides the `Session` abstraction and the pieces that own and
//! feed it:
//! - `Session`: one joined RTMS stream and its data callbacks
//! - `SessionRegistry`: active sessions keyed by stream ID
//! - `HandoffQueue`: work queued by webhook threads for the poll loop thread
//! - `DesignatedThread`: the capability required to drive a session

mod callbacks;
mod error;
mod handoff;
mod registry;
mod session;
mod stats;
mod thread;

pub use callbacks::{
    print_transcript, render_transcript_line, AudioCallback, TranscriptCallback,
    TranscriptDecodeError,
};
pub use error::SessionError;
pub use handoff::{Handoff, HandoffQueue, JoinRequest};
pub use registry::{SessionRegistry, SharedSession};
pub use session::{Progress, Session, SessionState};
pub use stats::SessionStats;
pub use thread::DesignatedThread;
