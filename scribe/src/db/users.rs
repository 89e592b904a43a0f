//! Owner lookup for job attribution
//!
//! Authentication lives outside this service; jobs are attributed to rows in
//! a minimal `users` table so admin listings can embed an owner summary. A
//! local default user is ensured at startup and owns all submitted jobs.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Owner summary embedded in admin job listings
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Ensure the default local user exists; returns its id
pub async fn ensure_default_user(pool: &SqlitePool) -> Result<i64> {
    sqlx::query(
        "INSERT OR IGNORE INTO users (username, email, created_at) VALUES (?, ?, ?)",
    )
    .bind("local")
    .bind("local@scribe.invalid")
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let row = sqlx::query("SELECT id FROM users WHERE username = ?")
        .bind("local")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("id")?)
}
