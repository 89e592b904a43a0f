//! External analysis engine contracts
//!
//! Transcription and diarization are external collaborators reached through
//! the two narrow traits below. Engine handles are constructed explicitly at
//! startup and passed into the application state; a not-ready engine is a
//! typed error, not a null check at the call site.

use axum::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::models::{Diarization, Transcript};

mod sidecar;
pub use sidecar::{SidecarDiarizer, SidecarTranscriber};

/// Engine invocation errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine process/model is not loaded or reachable
    #[error("Engine not ready: {0}")]
    NotReady(String),

    /// Transport-level failure talking to the engine
    #[error("Network error: {0}")]
    Network(String),

    /// Engine answered with a non-success status
    #[error("Engine error {0}: {1}")]
    Api(u16, String),

    /// Engine response did not match the expected shape
    #[error("Malformed engine response: {0}")]
    Parse(String),

    /// Failed to read the audio file handed to the engine
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Speech-to-text engine: audio file in, timed text segments out
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio at `audio_path`.
    ///
    /// `language` is an ISO code or `"auto"` for engine-side detection.
    async fn transcribe(&self, audio_path: &Path, language: &str)
        -> Result<Transcript, EngineError>;

    /// Whether the engine is loaded and accepting work
    async fn ready(&self) -> bool;
}

/// Speaker-diarization engine: audio file in, timed speaker turns out
#[async_trait]
pub trait Diarizer: Send + Sync {
    async fn diarize(&self, audio_path: &Path) -> Result<Diarization, EngineError>;

    /// Whether the engine is loaded and accepting work
    async fn ready(&self) -> bool;
}
