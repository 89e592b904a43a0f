//! Database access for scribe
//!
//! SQLite via sqlx. Timestamps are stored as RFC 3339 TEXT, ids as TEXT
//! UUIDs. Schema is created on pool init.

pub mod jobs;
pub mod users;
pub mod webhook_log;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool and schema
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),

            original_filename TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            content_type TEXT NOT NULL,
            language TEXT NOT NULL DEFAULT 'en',
            webhook_url TEXT,

            status TEXT NOT NULL DEFAULT 'pending',
            error_message TEXT,

            created_at TEXT NOT NULL,
            started_at TEXT,
            completed_at TEXT,

            upload_at TEXT,
            transcribed_at TEXT,
            diarized_at TEXT,
            merged_at TEXT,
            webhook_at TEXT,

            transcript_path TEXT,
            diarization_path TEXT,
            merged_path TEXT,

            webhook_delivered INTEGER NOT NULL DEFAULT 0,
            webhook_attempts INTEGER NOT NULL DEFAULT 0,
            webhook_last_attempt TEXT,
            webhook_error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only webhook delivery audit log. Deliberately no foreign key:
    // audit rows outlive job deletion.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhook_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            webhook_url TEXT NOT NULL,
            status_code INTEGER,
            response_body TEXT,
            error_message TEXT,
            attempt_number INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (users, jobs, webhook_log)");

    Ok(())
}
