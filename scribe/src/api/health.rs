//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Engine readiness flags
#[derive(Debug, Serialize)]
pub struct ModelsLoaded {
    pub transcriber: bool,
    pub diarizer: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when both engines are ready, "degraded" otherwise
    pub status: String,
    /// Module name ("scribe")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Whether each inference engine is loaded and reachable
    pub models_loaded: ModelsLoaded,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let models_loaded = ModelsLoaded {
        transcriber: state.transcriber.ready().await,
        diarizer: state.diarizer.ready().await,
    };
    let status = if models_loaded.transcriber && models_loaded.diarizer {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "scribe".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        models_loaded,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
