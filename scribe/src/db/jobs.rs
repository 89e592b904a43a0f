//! Job row operations
//!
//! The status setters encode the state machine in SQL: each UPDATE carries a
//! WHERE clause naming the expected predecessor state (or a NULL stage
//! column) and fails loudly when zero rows match, so a terminal job can never
//! be silently overwritten and a stage timestamp can never move.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::models::{Job, Stage};

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

/// Reconstruct a Job from a row holding all `jobs` columns
pub(crate) fn job_from_row(row: &SqliteRow) -> Result<Job> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Job {
        id: Uuid::parse_str(&id)?,
        user_id: row.try_get("user_id")?,
        original_filename: row.try_get("original_filename")?,
        file_size: row.try_get("file_size")?,
        content_type: row.try_get("content_type")?,
        language: row.try_get("language")?,
        webhook_url: row.try_get("webhook_url")?,
        status: row.try_get("status")?,
        error_message: row.try_get("error_message")?,
        created_at: parse_ts(&created_at)?,
        started_at: parse_opt_ts(row.try_get("started_at")?)?,
        completed_at: parse_opt_ts(row.try_get("completed_at")?)?,
        upload_at: parse_opt_ts(row.try_get("upload_at")?)?,
        transcribed_at: parse_opt_ts(row.try_get("transcribed_at")?)?,
        diarized_at: parse_opt_ts(row.try_get("diarized_at")?)?,
        merged_at: parse_opt_ts(row.try_get("merged_at")?)?,
        webhook_at: parse_opt_ts(row.try_get("webhook_at")?)?,
        transcript_path: row.try_get("transcript_path")?,
        diarization_path: row.try_get("diarization_path")?,
        merged_path: row.try_get("merged_path")?,
        webhook_delivered: row.try_get::<i64, _>("webhook_delivered")? != 0,
        webhook_attempts: row.try_get("webhook_attempts")?,
        webhook_last_attempt: parse_opt_ts(row.try_get("webhook_last_attempt")?)?,
        webhook_error: row.try_get("webhook_error")?,
    })
}

/// Insert a new job in `pending` state and return it
pub async fn create_job(
    pool: &SqlitePool,
    user_id: i64,
    original_filename: &str,
    file_size: i64,
    content_type: &str,
    language: &str,
    webhook_url: Option<&str>,
) -> Result<Job> {
    let id = Uuid::new_v4();
    let created_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO jobs (id, user_id, original_filename, file_size, content_type,
                          language, webhook_url, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id)
    .bind(original_filename)
    .bind(file_size)
    .bind(content_type)
    .bind(language)
    .bind(webhook_url)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    get_job(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Job {} vanished after insert", id))
}

/// Fetch a job by id
pub async fn get_job(pool: &SqlitePool, id: Uuid) -> Result<Option<Job>> {
    let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// pending → processing; records started_at
pub async fn mark_processing(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query(
        "UPDATE jobs SET status = 'processing', started_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("Job {} is not pending; refusing status transition", id);
    }
    Ok(())
}

/// processing → completed; records completed_at
pub async fn mark_completed(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query(
        "UPDATE jobs SET status = 'completed', completed_at = ? WHERE id = ? AND status = 'processing'",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("Job {} is not processing; refusing status transition", id);
    }
    Ok(())
}

/// processing → failed; captures the error text verbatim
pub async fn mark_failed(pool: &SqlitePool, id: Uuid, error_message: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE jobs SET status = 'failed', error_message = ?, completed_at = ?
        WHERE id = ? AND status = 'processing'
        "#,
    )
    .bind(error_message)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("Job {} is not processing; refusing status transition", id);
    }
    Ok(())
}

/// Record a stage completion timestamp; each stage settable exactly once
pub async fn mark_stage_done(pool: &SqlitePool, id: Uuid, stage: Stage) -> Result<()> {
    // Column name comes from the Stage enum, never from user input
    let sql = format!(
        "UPDATE jobs SET {col} = ? WHERE id = ? AND {col} IS NULL",
        col = stage.column()
    );

    let result = sqlx::query(&sql)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        bail!("Stage timestamp {} already recorded for job {}", stage.column(), id);
    }
    Ok(())
}

/// Record artifact paths after a successful save
pub async fn set_artifact_paths(
    pool: &SqlitePool,
    id: Uuid,
    transcript_path: &str,
    diarization_path: &str,
    merged_path: &str,
) -> Result<()> {
    sqlx::query(
        "UPDATE jobs SET transcript_path = ?, diarization_path = ?, merged_path = ? WHERE id = ?",
    )
    .bind(transcript_path)
    .bind(diarization_path)
    .bind(merged_path)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Record the outcome of one webhook dispatch on the job row
///
/// The attempt counter is passive observability: it is incremented on every
/// attempt but never drives re-delivery.
pub async fn record_webhook_outcome(
    pool: &SqlitePool,
    id: Uuid,
    delivered: bool,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET webhook_delivered = ?,
            webhook_attempts = webhook_attempts + 1,
            webhook_last_attempt = ?,
            webhook_error = ?
        WHERE id = ?
        "#,
    )
    .bind(delivered as i64)
    .bind(Utc::now().to_rfc3339())
    .bind(error)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Filters for the admin job listing
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    /// Substring match on filename, job id, or owner username
    pub search: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl JobFilter {
    /// WHERE clause and bind values shared by the count and page queries
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if let Some(search) = &self.search {
            conditions.push(
                "(jobs.original_filename LIKE ? OR jobs.id LIKE ? OR users.username LIKE ?)"
                    .to_string(),
            );
            let pattern = format!("%{}%", search);
            binds.push(pattern.clone());
            binds.push(pattern.clone());
            binds.push(pattern);
        }
        if let Some(status) = &self.status {
            conditions.push("jobs.status = ?".to_string());
            binds.push(status.clone());
        }
        if let Some(from) = &self.date_from {
            conditions.push("jobs.created_at >= ?".to_string());
            binds.push(from.to_rfc3339());
        }
        if let Some(to) = &self.date_to {
            conditions.push("jobs.created_at <= ?".to_string());
            binds.push(to.to_rfc3339());
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, binds)
    }
}

/// Job plus its owner summary, for admin listings
#[derive(Debug, Clone)]
pub struct JobWithOwner {
    pub job: Job,
    pub username: String,
    pub email: String,
}

/// Count jobs matching a filter
pub async fn count_jobs(pool: &SqlitePool, filter: &JobFilter) -> Result<i64> {
    let (clause, binds) = filter.where_clause();
    let sql = format!(
        "SELECT COUNT(*) FROM jobs JOIN users ON users.id = jobs.user_id{}",
        clause
    );

    let mut query = sqlx::query_scalar(&sql);
    for bind in &binds {
        query = query.bind(bind);
    }
    Ok(query.fetch_one(pool).await?)
}

/// Fetch one page of jobs matching a filter, newest first
pub async fn list_jobs(
    pool: &SqlitePool,
    filter: &JobFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<JobWithOwner>> {
    let (clause, binds) = filter.where_clause();
    let sql = format!(
        r#"
        SELECT jobs.*, users.username AS owner_username, users.email AS owner_email
        FROM jobs JOIN users ON users.id = jobs.user_id{}
        ORDER BY jobs.created_at DESC
        LIMIT ? OFFSET ?
        "#,
        clause
    );

    let mut query = sqlx::query(&sql);
    for bind in &binds {
        query = query.bind(bind);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    rows.iter()
        .map(|row| {
            Ok(JobWithOwner {
                job: job_from_row(row)?,
                username: row.try_get("owner_username")?,
                email: row.try_get("owner_email")?,
            })
        })
        .collect()
}

/// Aggregate statistics over all jobs
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobStats {
    pub total_jobs: i64,
    pub pending_jobs: i64,
    pub processing_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub total_users: i64,
    pub total_file_size: i64,
    /// Mean started→completed wall clock over completed jobs, None when empty
    pub average_processing_seconds: Option<f64>,
}

/// Compute aggregate statistics
pub async fn stats(pool: &SqlitePool) -> Result<JobStats> {
    let mut counts = std::collections::HashMap::new();
    let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM jobs GROUP BY status")
        .fetch_all(pool)
        .await?;
    for row in &rows {
        let status: String = row.try_get("status")?;
        let n: i64 = row.try_get("n")?;
        counts.insert(status, n);
    }

    let total_file_size: Option<i64> = sqlx::query_scalar("SELECT SUM(file_size) FROM jobs")
        .fetch_one(pool)
        .await?;

    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    // Average in Rust: sqlite's date parsing is looser than rfc3339 and the
    // row count here is small
    let spans = sqlx::query(
        r#"
        SELECT started_at, completed_at FROM jobs
        WHERE status = 'completed' AND started_at IS NOT NULL AND completed_at IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut total_seconds = 0.0;
    for row in &spans {
        let started: String = row.try_get("started_at")?;
        let completed: String = row.try_get("completed_at")?;
        let span = parse_ts(&completed)? - parse_ts(&started)?;
        total_seconds += span.num_milliseconds() as f64 / 1000.0;
    }
    let average_processing_seconds = if spans.is_empty() {
        None
    } else {
        Some(total_seconds / spans.len() as f64)
    };

    let count = |status: &str| counts.get(status).copied().unwrap_or(0);
    Ok(JobStats {
        total_jobs: counts.values().sum(),
        pending_jobs: count("pending"),
        processing_jobs: count("processing"),
        completed_jobs: count("completed"),
        failed_jobs: count("failed"),
        total_users,
        total_file_size: total_file_size.unwrap_or(0),
        average_processing_seconds,
    })
}

/// Delete a job row; returns false when the job does not exist
///
/// Webhook audit rows are append-only and deliberately survive the job.
pub async fn delete_job(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
