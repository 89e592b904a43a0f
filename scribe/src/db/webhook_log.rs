//! Append-only webhook delivery audit log
//!
//! One row per dispatch attempt, written unconditionally whatever the
//! outcome. Rows are never updated or deleted.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// One recorded delivery attempt
#[derive(Debug, Clone, serde::Serialize)]
pub struct WebhookAttempt {
    pub id: i64,
    pub job_id: Uuid,
    pub webhook_url: String,
    /// HTTP status when an exchange completed, None on transport failure
    pub status_code: Option<i64>,
    /// First 500 characters of the response body
    pub response_body: Option<String>,
    /// Transport error text, None when an exchange completed
    pub error_message: Option<String>,
    pub attempt_number: i64,
    pub created_at: DateTime<Utc>,
}

/// Append one attempt row
pub async fn log_attempt(
    pool: &SqlitePool,
    job_id: Uuid,
    webhook_url: &str,
    status_code: Option<i64>,
    response_body: Option<&str>,
    error_message: Option<&str>,
    attempt_number: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO webhook_log (job_id, webhook_url, status_code, response_body,
                                 error_message, attempt_number, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job_id.to_string())
    .bind(webhook_url)
    .bind(status_code)
    .bind(response_body)
    .bind(error_message)
    .bind(attempt_number)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// All attempts recorded for a job, oldest first
pub async fn attempts_for_job(pool: &SqlitePool, job_id: Uuid) -> Result<Vec<WebhookAttempt>> {
    let rows = sqlx::query(
        "SELECT * FROM webhook_log WHERE job_id = ? ORDER BY id ASC",
    )
    .bind(job_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let job_id: String = row.try_get("job_id")?;
            let created_at: String = row.try_get("created_at")?;
            Ok(WebhookAttempt {
                id: row.try_get("id")?,
                job_id: Uuid::parse_str(&job_id)?,
                webhook_url: row.try_get("webhook_url")?,
                status_code: row.try_get("status_code")?,
                response_body: row.try_get("response_body")?,
                error_message: row.try_get("error_message")?,
                attempt_number: row.try_get("attempt_number")?,
                created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
            })
        })
        .collect()
}
