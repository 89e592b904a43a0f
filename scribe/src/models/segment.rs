//! Timed segment records exchanged between pipeline stages
//!
//! These are the explicit, serde-validated shapes that replace the loose
//! dictionary payloads the engines speak natively. Shape problems surface at
//! the engine boundary (deserialization), not deep inside the merge step.

use serde::{Deserialize, Serialize};

/// Sentinel speaker label for transcript segments with no diarization overlap
pub const UNKNOWN_SPEAKER: &str = "unknown";

/// One timed text segment from the transcription engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment start, seconds from start of audio
    pub start: f64,
    /// Segment end, seconds (end >= start)
    pub end: f64,
    /// Transcribed text
    pub text: String,
}

/// One timed speaker turn from the diarization engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarizationSegment {
    pub start: f64,
    pub end: f64,
    /// Speaker label as produced by the engine (e.g., "SPEAKER_00")
    pub speaker: String,
}

/// One speaker-attributed text segment in the merged output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Winning speaker label, or [`UNKNOWN_SPEAKER`] when nothing overlapped
    pub speaker: String,
}

/// Transcript artifact: full text plus timed segments and detected language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub language: String,
}

/// Diarization artifact: timed speaker turns, insertion order preserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diarization {
    pub segments: Vec<DiarizationSegment>,
}

/// Merged artifact: one segment per transcript segment, speaker attributed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTranscript {
    pub language: String,
    pub segments: Vec<MergedSegment>,
}
