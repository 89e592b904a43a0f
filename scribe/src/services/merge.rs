//! Transcript/diarization fusion
//!
//! Pure interval-overlap merge: each transcript segment takes the speaker of
//! the diarization segment it overlaps the most. No I/O, no failure mode;
//! deterministic for identical inputs.

use crate::models::{
    Diarization, DiarizationSegment, MergedSegment, MergedTranscript, Transcript,
    TranscriptSegment, UNKNOWN_SPEAKER,
};

/// Merge timed text segments with speaker turns
///
/// For each transcript segment, candidate speaker turns are those whose
/// closed interval touches it (`d.start <= s.end && d.end >= s.start`;
/// zero-length overlap counts). The candidate with the greatest overlap
/// duration wins; ties go to the first candidate encountered. Segments with
/// no candidate get the `"unknown"` speaker. Output order and length mirror
/// the transcript input exactly.
pub fn merge(transcript: &Transcript, diarization: &Diarization) -> MergedTranscript {
    let segments = transcript
        .segments
        .iter()
        .map(|seg| MergedSegment {
            start: seg.start,
            end: seg.end,
            text: seg.text.clone(),
            speaker: dominant_speaker(seg, &diarization.segments),
        })
        .collect();

    MergedTranscript {
        language: transcript.language.clone(),
        segments,
    }
}

/// Speaker turn with the greatest overlap, first maximum on ties
fn dominant_speaker(seg: &TranscriptSegment, turns: &[DiarizationSegment]) -> String {
    let mut best: Option<(&DiarizationSegment, f64)> = None;

    for turn in turns {
        if turn.start <= seg.end && turn.end >= seg.start {
            let overlap = turn.end.min(seg.end) - turn.start.max(seg.start);
            // Strict > keeps the first maximum on ties
            match best {
                Some((_, best_overlap)) if overlap <= best_overlap => {}
                _ => best = Some((turn, overlap)),
            }
        }
    }

    match best {
        Some((turn, _)) => turn.speaker.clone(),
        None => UNKNOWN_SPEAKER.to_string(),
    }
}
