//! Processing pipeline orchestrator
//!
//! Owns the full life of one job: validate → create record → transcribe →
//! diarize → merge → persist artifacts → webhook → finalize. Stages run
//! strictly in that order within a job; distinct jobs run as independent
//! request tasks and never contend on the same row.
//!
//! Failure policy: the first failing stage aborts the rest, the job is
//! marked failed with the captured error text before the response is
//! written, and nothing is retried. The webhook step is the one exception:
//! its outcome never fails the job.

use anyhow::{anyhow, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::db::jobs;
use crate::error::ApiError;
use crate::models::{Diarization, Job, MergedTranscript, Stage, Transcript};
use crate::services::merge::merge;
use crate::services::storage::ArtifactKind;
use crate::AppState;

/// Audio types accepted for processing, keyed by file extension
const ALLOWED_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "m4v", "flac", "ogg"];

/// Declared content types accepted for processing
const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "audio/wav",
    "audio/x-wav",
    "audio/mp3",
    "audio/mpeg",
    "audio/m4a",
    "audio/mp4",
    "audio/m4v",
    "audio/flac",
    "audio/ogg",
];

/// One upload as received from the submit endpoint
#[derive(Debug)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub language: String,
    pub webhook_url: Option<String>,
    pub data: Vec<u8>,
}

/// Metadata echoed back in responses and webhook payloads
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub original_name: String,
    pub size: i64,
    pub content_type: String,
}

/// Payload POSTed to the caller's webhook URL
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub status: &'a str,
    pub job_id: Uuid,
    pub transcript_file: &'a Transcript,
    pub diarization_file: &'a Diarization,
    pub merged_file: &'a MergedTranscript,
    pub file_info: &'a FileInfo,
}

/// Everything the submit endpoint needs to build its response
#[derive(Debug)]
pub struct PipelineOutput {
    pub job: Job,
    pub transcript: Transcript,
    pub diarization: Diarization,
    pub merged: MergedTranscript,
    pub webhook_sent: bool,
    pub file_info: FileInfo,
}

fn file_extension(filename: &str) -> Option<&str> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
}

/// Reject unsupported uploads before any persisted side effect
pub fn validate_upload(filename: &str, content_type: &str) -> Result<(), String> {
    let ext = file_extension(filename)
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!(
            "Unsupported file extension '{}'. Allowed: {}",
            ext,
            ALLOWED_EXTENSIONS.join(", ")
        ));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(format!(
            "Unsupported content type '{}'. Allowed: {}",
            content_type,
            ALLOWED_CONTENT_TYPES.join(", ")
        ));
    }
    Ok(())
}

/// Run the full pipeline for one upload
///
/// The job row is durably in a terminal state before this returns, so it
/// stays the source of truth even if the response is lost.
pub async fn run_pipeline(
    state: &AppState,
    user_id: i64,
    upload: UploadRequest,
) -> Result<PipelineOutput, ApiError> {
    // Validation happens before the job row exists
    validate_upload(&upload.filename, &upload.content_type).map_err(ApiError::BadRequest)?;

    let file_info = FileInfo {
        original_name: upload.filename.clone(),
        size: upload.data.len() as i64,
        content_type: upload.content_type.clone(),
    };

    let job = jobs::create_job(
        &state.db,
        user_id,
        &upload.filename,
        upload.data.len() as i64,
        &upload.content_type,
        &upload.language,
        upload.webhook_url.as_deref(),
    )
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let job_id = job.id;
    tracing::info!(
        "Job {} created for {} ({} bytes, language {})",
        job_id,
        upload.filename,
        upload.data.len(),
        upload.language
    );

    jobs::mark_processing(&state.db, job_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    // Stage failures land here; the webhook step is outside this block
    // because its outcome must not fail the job.
    match run_stages(state, user_id, job_id, &upload).await {
        Ok((transcript, diarization, merged)) => {
            let mut webhook_sent = false;
            if let Some(webhook_url) = &upload.webhook_url {
                let payload = WebhookPayload {
                    status: "success",
                    job_id,
                    transcript_file: &transcript,
                    diarization_file: &diarization,
                    merged_file: &merged,
                    file_info: &file_info,
                };
                webhook_sent = state
                    .webhook
                    .dispatch(&state.db, job_id, webhook_url, &payload)
                    .await;
                if let Err(e) = jobs::mark_stage_done(&state.db, job_id, Stage::Webhook).await {
                    tracing::error!("Job {}: {}", job_id, e);
                }
            }

            jobs::mark_completed(&state.db, job_id)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            tracing::info!("Job {} completed", job_id);

            let job = jobs::get_job(&state.db, job_id)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?
                .ok_or_else(|| ApiError::Internal(format!("Job {} disappeared", job_id)))?;

            Ok(PipelineOutput {
                job,
                transcript,
                diarization,
                merged,
                webhook_sent,
                file_info,
            })
        }
        Err(e) => {
            let error_message = e.to_string();
            tracing::error!("Job {} failed: {}", job_id, error_message);
            // Record the failure before surfacing it
            jobs::mark_failed(&state.db, job_id, &error_message)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Err(ApiError::Pipeline(error_message))
        }
    }
}

/// The fallible stages: upload materialization through artifact persistence
async fn run_stages(
    state: &AppState,
    user_id: i64,
    job_id: Uuid,
    upload: &UploadRequest,
) -> Result<(Transcript, Diarization, MergedTranscript)> {
    // Scoped temp file: removed on drop on every exit path
    let suffix = file_extension(&upload.filename)
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let temp = tempfile::Builder::new()
        .prefix("scribe-upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| anyhow!("Failed to create temp file: {}", e))?;

    tokio::fs::write(temp.path(), &upload.data)
        .await
        .map_err(|e| anyhow!("Failed to write uploaded audio: {}", e))?;
    jobs::mark_stage_done(&state.db, job_id, Stage::Upload).await?;

    let transcript = state
        .transcriber
        .transcribe(temp.path(), &upload.language)
        .await
        .map_err(|e| anyhow!("Transcription failed: {}", e))?;
    jobs::mark_stage_done(&state.db, job_id, Stage::Transcription).await?;
    tracing::debug!(
        "Job {}: transcription produced {} segments",
        job_id,
        transcript.segments.len()
    );

    let diarization = state
        .diarizer
        .diarize(temp.path())
        .await
        .map_err(|e| anyhow!("Diarization failed: {}", e))?;
    jobs::mark_stage_done(&state.db, job_id, Stage::Diarization).await?;
    tracing::debug!(
        "Job {}: diarization produced {} speaker turns",
        job_id,
        diarization.segments.len()
    );

    let merged = merge(&transcript, &diarization);
    jobs::mark_stage_done(&state.db, job_id, Stage::Merge).await?;

    let transcript_path = state
        .artifacts
        .write_artifact(user_id, job_id, ArtifactKind::Transcript, &transcript)
        .await?;
    let diarization_path = state
        .artifacts
        .write_artifact(user_id, job_id, ArtifactKind::Diarization, &diarization)
        .await?;
    let merged_path = state
        .artifacts
        .write_artifact(user_id, job_id, ArtifactKind::Merged, &merged)
        .await?;

    jobs::set_artifact_paths(
        &state.db,
        job_id,
        &transcript_path.to_string_lossy(),
        &diarization_path.to_string_lossy(),
        &merged_path.to_string_lossy(),
    )
    .await?;

    Ok((transcript, diarization, merged))
}
