//! scribe library - audio transcription and speaker attribution service
//!
//! Accepts an uploaded audio file, runs speech-to-text and speaker
//! diarization through external inference engines, fuses both outputs into a
//! speaker-attributed transcript, persists the artifacts, and optionally
//! notifies a caller-supplied webhook.

pub mod api;
pub mod config;
pub mod db;
pub mod engines;
pub mod error;
pub mod models;
pub mod pagination;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engines::{Diarizer, Transcriber};
use crate::services::{ArtifactStore, WebhookDispatcher};

/// Upload size cap for the multipart submit endpoint (512 MiB)
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Application state shared across HTTP handlers
///
/// The engine handles are constructed once at startup and passed in; there
/// are no lazily-initialized globals.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Speech-to-text engine
    pub transcriber: Arc<dyn Transcriber>,
    /// Speaker-diarization engine
    pub diarizer: Arc<dyn Diarizer>,
    /// Artifact store rooted at the configured output directory
    pub artifacts: ArtifactStore,
    /// Webhook dispatcher with the configured timeout
    pub webhook: WebhookDispatcher,
    /// Owner id that submitted jobs are attributed to
    pub default_user_id: i64,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        transcriber: Arc<dyn Transcriber>,
        diarizer: Arc<dyn Diarizer>,
        artifacts: ArtifactStore,
        webhook: WebhookDispatcher,
        default_user_id: i64,
    ) -> Self {
        Self {
            db,
            transcriber,
            diarizer,
            artifacts,
            webhook,
            default_user_id,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    Router::new()
        .route("/process", post(api::process::process_audio))
        .route("/admin/jobs", get(api::admin::list_jobs))
        .route("/admin/jobs/:job_id", delete(api::admin::delete_job))
        .route("/admin/stats", get(api::admin::stats))
        .route(
            "/admin/download/:job_id/:file_type",
            get(api::admin::download_artifact),
        )
        .merge(api::health::health_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
