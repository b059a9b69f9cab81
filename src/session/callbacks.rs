//! Data callbacks registered on a session and the reference transcript printer

use anyhow::Result;
use std::str::Utf8Error;
use thiserror::Error;

use crate::transport::{AudioData, TranscriptData};

/// Called on the poll loop thread for every transcript chunk
pub type TranscriptCallback = Box<dyn FnMut(&TranscriptData) -> Result<()> + Send>;

/// Called on the poll loop thread for every audio chunk
pub type AudioCallback = Box<dyn FnMut(&AudioData) -> Result<()> + Send>;

#[derive(Debug, Error)]
#[error("Transcript from {user_name} at {timestamp} is not valid UTF-8: {source}")]
pub struct TranscriptDecodeError {
    pub user_name: String,
    pub timestamp: u64,
    #[source]
    pub source: Utf8Error,
}

/// Render a transcript chunk as `[<timestamp>] -- <user name>: <text>`
pub fn render_transcript_line(transcript: &TranscriptData) -> Result<String, TranscriptDecodeError> {
    let text = std::str::from_utf8(&transcript.data).map_err(|source| TranscriptDecodeError {
        user_name: transcript.metadata.user_name.clone(),
        timestamp: transcript.timestamp,
        source,
    })?;

    Ok(format!(
        "[{}] -- {}: {}",
        transcript.timestamp, transcript.metadata.user_name, text
    ))
}

/// Transcript callback that prints each chunk to stdout
pub fn print_transcript(transcript: &TranscriptData) -> Result<()> {
    let line = render_transcript_line(transcript)?;
    println!("{}", line);
    Ok(())
}
