//! Webhook delivery
//!
//! One POST per job, best-effort. Whatever the outcome, exactly one audit row
//! is appended and the job's attempt counter advances; delivery failure never
//! fails the job. There is no automatic re-delivery: the counter exists for
//! observability only.

use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use uuid::Uuid;

use crate::db::{jobs, webhook_log};

/// Response bodies are truncated to this many characters in the audit log
const RESPONSE_BODY_LIMIT: usize = 500;

fn truncate_body(body: &str) -> Option<String> {
    if body.is_empty() {
        None
    } else {
        Some(body.chars().take(RESPONSE_BODY_LIMIT).collect())
    }
}

/// Webhook dispatcher with a fixed per-request timeout
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
}

impl WebhookDispatcher {
    /// Build a dispatcher; `timeout` bounds the whole HTTP exchange
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("scribe/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Perform exactly one delivery attempt; returns whether it succeeded
    ///
    /// Success is any 2xx status. Audit and job bookkeeping happen on every
    /// path; bookkeeping failures are logged, never surfaced, since the
    /// pipeline must not fail on the webhook step.
    pub async fn dispatch<T: Serialize>(
        &self,
        pool: &SqlitePool,
        job_id: Uuid,
        webhook_url: &str,
        payload: &T,
    ) -> bool {
        let attempt_number = match jobs::get_job(pool, job_id).await {
            Ok(Some(job)) => job.webhook_attempts + 1,
            _ => 1,
        };

        let result = self
            .client
            .post(webhook_url)
            .json(payload)
            .send()
            .await;

        let (delivered, status_code, response_body, error) = match result {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let delivered = status.is_success();
                let error = if delivered {
                    None
                } else {
                    Some(format!("HTTP {}", status.as_u16()))
                };
                (delivered, Some(status.as_u16() as i64), truncate_body(&body), error)
            }
            Err(e) => (false, None, None, Some(e.to_string())),
        };

        // Audit row first: it must exist whatever else goes wrong
        if let Err(e) = webhook_log::log_attempt(
            pool,
            job_id,
            webhook_url,
            status_code,
            response_body.as_deref(),
            // A completed HTTP exchange is audited by its status code alone
            if status_code.is_some() { None } else { error.as_deref() },
            attempt_number,
        )
        .await
        {
            tracing::error!("Failed to write webhook audit row for job {}: {}", job_id, e);
        }

        if let Err(e) =
            jobs::record_webhook_outcome(pool, job_id, delivered, error.as_deref()).await
        {
            tracing::error!("Failed to record webhook outcome for job {}: {}", job_id, e);
        }

        match (&delivered, &error) {
            (true, _) => tracing::info!("Webhook delivered for job {} to {}", job_id, webhook_url),
            (false, Some(err)) => {
                tracing::warn!("Webhook failed for job {}: {}", job_id, err)
            }
            _ => {}
        }

        delivered
    }
}
