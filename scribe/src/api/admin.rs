//! Admin endpoints: job browsing, statistics, artifact download/deletion
//!
//! Read-side facade over the job records. These endpoints never touch the
//! pipeline; missing jobs or files are not-found conditions, not faults.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::db::jobs::{self, JobFilter, JobStats, JobWithOwner};
use crate::db::users::UserSummary;
use crate::error::{ApiError, ApiResult};
use crate::models::JobStatus;
use crate::pagination::{calculate_pagination, DEFAULT_LIMIT};
use crate::services::storage::ArtifactKind;
use crate::AppState;

/// Query parameters for the job listing
#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
    /// Rows per page (clamped to 1..=100)
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Substring match on filename, job id, or owner username
    pub search: Option<String>,
    pub status: Option<String>,
    /// RFC 3339 lower bound on created_at
    pub date_from: Option<String>,
    /// RFC 3339 upper bound on created_at
    pub date_to: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// One job row in the admin listing
#[derive(Debug, Serialize)]
pub struct JobListEntry {
    pub id: Uuid,
    pub user: UserSummary,
    pub original_filename: String,
    pub file_size: i64,
    pub content_type: String,
    pub language: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub webhook_url: Option<String>,
    pub webhook_delivered: bool,
    pub webhook_attempts: i64,
    pub webhook_error: Option<String>,
}

impl From<JobWithOwner> for JobListEntry {
    fn from(row: JobWithOwner) -> Self {
        let job = row.job;
        Self {
            id: job.id,
            user: UserSummary {
                id: job.user_id,
                username: row.username,
                email: row.email,
            },
            original_filename: job.original_filename,
            file_size: job.file_size,
            content_type: job.content_type,
            language: job.language,
            status: job.status,
            error_message: job.error_message,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            webhook_url: job.webhook_url,
            webhook_delivered: job.webhook_delivered,
            webhook_attempts: job.webhook_attempts,
            webhook_error: job.webhook_error,
        }
    }
}

/// Pagination metadata in the listing response
#[derive(Debug, Serialize)]
pub struct PaginationInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

/// Listing response
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobListEntry>,
    pub pagination: PaginationInfo,
}

fn parse_date(value: &str, field: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} format", field)))
}

/// GET /admin/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<Json<JobListResponse>> {
    if let Some(status) = &query.status {
        if JobStatus::parse(status).is_none() {
            return Err(ApiError::BadRequest(format!("Unknown status '{}'", status)));
        }
    }

    let filter = JobFilter {
        search: query.search.clone(),
        status: query.status.clone(),
        date_from: query
            .date_from
            .as_deref()
            .map(|v| parse_date(v, "date_from"))
            .transpose()?,
        date_to: query
            .date_to
            .as_deref()
            .map(|v| parse_date(v, "date_to"))
            .transpose()?,
    };

    let total = jobs::count_jobs(&state.db, &filter)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let pagination = calculate_pagination(total, query.page, query.limit);

    let rows = jobs::list_jobs(&state.db, &filter, pagination.limit, pagination.offset)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(JobListResponse {
        jobs: rows.into_iter().map(JobListEntry::from).collect(),
        pagination: PaginationInfo {
            page: pagination.page,
            limit: pagination.limit,
            total: pagination.total,
            pages: pagination.pages,
        },
    }))
}

/// GET /admin/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<JobStats>> {
    let stats = jobs::stats(&state.db)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(stats))
}

fn parse_job_id(job_id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(job_id).map_err(|_| ApiError::NotFound("Job not found".to_string()))
}

/// GET /admin/download/:job_id/:file_type
pub async fn download_artifact(
    State(state): State<AppState>,
    Path((job_id, file_type)): Path<(String, String)>,
) -> ApiResult<Response> {
    let kind = ArtifactKind::parse(&file_type).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid file type '{}'. Allowed: transcript, diarization, merged",
            file_type
        ))
    })?;
    let job_id = parse_job_id(&job_id)?;

    let job = jobs::get_job(&state.db, job_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    let relative = match kind {
        ArtifactKind::Transcript => job.transcript_path,
        ArtifactKind::Diarization => job.diarization_path,
        ArtifactKind::Merged => job.merged_path,
    }
    .ok_or_else(|| ApiError::NotFound(format!("{} file not found", kind.as_str())))?;

    let path = state.artifacts.absolute_path(std::path::Path::new(&relative));
    let contents = match tokio::fs::read(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("File not found on disk".to_string()));
        }
        Err(e) => return Err(ApiError::Io(e)),
    };

    let disposition = format!(
        "attachment; filename=\"{}_{}.json\"",
        job_id,
        kind.as_str()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        contents,
    )
        .into_response())
}

/// DELETE /admin/jobs/:job_id
///
/// Removes the artifact files (best-effort per file) and then the job row,
/// so no surviving record can point at a deleted file.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let job_id = parse_job_id(&job_id)?;

    let job = jobs::get_job(&state.db, job_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    let removed = state.artifacts.remove_job_artifacts(job.user_id, job_id).await;
    tracing::info!("Job {}: removed {} artifact files", job_id, removed);

    jobs::delete_job(&state.db, job_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({ "message": "Job deleted successfully" })))
}
