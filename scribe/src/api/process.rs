//! Job submission endpoint
//!
//! POST /process - multipart upload containing the audio file, a language
//! code, and an optional webhook URL. The pipeline runs to completion within
//! this request; the response embeds all three artifacts.

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Diarization, Job, MergedTranscript, Transcript};
use crate::services::pipeline::{run_pipeline, FileInfo, UploadRequest};
use crate::AppState;

/// Per-stage completion timestamps echoed in the response
#[derive(Debug, Serialize)]
pub struct ProcessingSteps {
    pub upload: Option<DateTime<Utc>>,
    pub transcription: Option<DateTime<Utc>>,
    pub diarization: Option<DateTime<Utc>>,
    pub merge: Option<DateTime<Utc>>,
    pub webhook: Option<DateTime<Utc>>,
}

impl ProcessingSteps {
    fn from_job(job: &Job) -> Self {
        Self {
            upload: job.upload_at,
            transcription: job.transcribed_at,
            diarization: job.diarized_at,
            merge: job.merged_at,
            webhook: job.webhook_at,
        }
    }
}

/// Successful submit response
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub status: String,
    pub job_id: Uuid,
    pub processing_steps: ProcessingSteps,
    pub transcript_file: Transcript,
    pub diarization_file: Diarization,
    pub merged_file: MergedTranscript,
    pub webhook_sent: bool,
    pub file_info: FileInfo,
}

/// POST /process
pub async fn process_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ProcessResponse>> {
    let mut filename = None;
    let mut content_type = None;
    let mut data = None;
    let mut language = "en".to_string();
    let mut webhook_url = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                filename = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                        .to_vec(),
                );
            }
            Some("language") => {
                language = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid language field: {}", e)))?;
            }
            Some("webhook_url") => {
                let url = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Invalid webhook_url field: {}", e))
                })?;
                if !url.is_empty() {
                    webhook_url = Some(url);
                }
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;
    let filename =
        filename.ok_or_else(|| ApiError::BadRequest("File field has no filename".to_string()))?;
    let content_type = content_type
        .ok_or_else(|| ApiError::BadRequest("File field has no content type".to_string()))?;

    let upload = UploadRequest {
        filename,
        content_type,
        language,
        webhook_url,
        data,
    };

    let output = run_pipeline(&state, state.default_user_id, upload).await?;

    Ok(Json(ProcessResponse {
        status: "success".to_string(),
        job_id: output.job.id,
        processing_steps: ProcessingSteps::from_job(&output.job),
        transcript_file: output.transcript,
        diarization_file: output.diarization,
        merged_file: output.merged,
        webhook_sent: output.webhook_sent,
        file_info: output.file_info,
    }))
}
