//! Data model types shared across the service

pub mod job;
pub mod segment;

pub use job::{Job, JobStatus, Stage};
pub use segment::{
    Diarization, DiarizationSegment, MergedSegment, MergedTranscript, Transcript,
    TranscriptSegment, UNKNOWN_SPEAKER,
};
