//! scribe - audio transcription and speaker attribution service
//!
//! Accepts audio uploads, drives them through the external transcription and
//! diarization engines, merges the outputs into a speaker-attributed
//! transcript, persists artifacts, and notifies caller webhooks.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use scribe::config::Settings;
use scribe::engines::{SidecarDiarizer, SidecarTranscriber};
use scribe::services::{ArtifactStore, WebhookDispatcher};
use scribe::AppState;

#[derive(Debug, Parser)]
#[command(name = "scribe", about = "Audio transcription and speaker attribution service")]
struct Args {
    /// Path to TOML config file
    #[arg(long, env = "SCRIBE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting scribe v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    info!("Output directory: {}", settings.output_dir.display());

    // Database pool + schema
    let pool = scribe::db::init_database_pool(&settings.database_path).await?;
    info!("Database: {}", settings.database_path.display());

    // Jobs need an owner row; auth lives outside this service
    let default_user_id = scribe::db::users::ensure_default_user(&pool).await?;

    // Engine handles are constructed here, once, and passed in; readiness is
    // surfaced through /health rather than checked lazily at call sites
    let transcriber = SidecarTranscriber::new(
        settings.transcriber_url.clone(),
        settings.transcriber_model.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to build transcriber client: {}", e))?;
    let diarizer = SidecarDiarizer::new(
        settings.diarizer_url.clone(),
        settings.diarizer_model.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to build diarizer client: {}", e))?;
    info!(
        "Engines: transcriber {} (model {}), diarizer {} (model {})",
        settings.transcriber_url,
        settings.transcriber_model,
        settings.diarizer_url,
        settings.diarizer_model
    );

    let artifacts = ArtifactStore::new(settings.output_dir.clone());
    let webhook = WebhookDispatcher::new(settings.webhook_timeout())?;

    let state = AppState::new(
        pool,
        Arc::new(transcriber),
        Arc::new(diarizer),
        artifacts,
        webhook,
        default_user_id,
    );
    let app = scribe::build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("scribe listening on http://{}", settings.bind_addr);
    info!("Health check: http://{}/health", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
