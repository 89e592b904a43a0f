//! HTTP clients for the inference sidecars
//!
//! The speech models run in separate inference processes; this module is the
//! only place that knows their wire format. Responses are deserialized into
//! the typed segment records, so a malformed engine payload is caught here
//! rather than inside the merge step.
//!
//! No deadline is applied to the inference calls themselves: transcription of
//! a long file legitimately takes minutes, and a hung engine hangs only the
//! owning job.

use axum::async_trait;
use std::path::Path;

use crate::models::{Diarization, Transcript};

use super::{Diarizer, EngineError, Transcriber};

const USER_AGENT: &str = concat!("scribe/", env!("CARGO_PKG_VERSION"));

fn build_client() -> Result<reqwest::Client, EngineError> {
    // No request timeout: inference duration scales with audio length
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| EngineError::Network(e.to_string()))
}

async fn probe_health(client: &reqwest::Client, base_url: &str) -> bool {
    match client.get(format!("{}/health", base_url)).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

async fn read_audio(audio_path: &Path) -> Result<Vec<u8>, EngineError> {
    Ok(tokio::fs::read(audio_path).await?)
}

/// Transcription sidecar client
pub struct SidecarTranscriber {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl SidecarTranscriber {
    pub fn new(base_url: String, model: String) -> Result<Self, EngineError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl Transcriber for SidecarTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<Transcript, EngineError> {
        let audio = read_audio(audio_path).await?;

        let mut request = self
            .client
            .post(format!("{}/v1/transcribe", self.base_url))
            .query(&[("model", self.model.as_str())])
            .header("Content-Type", "application/octet-stream")
            .body(audio);

        // "auto" means engine-side language detection: omit the parameter
        if language != "auto" {
            request = request.query(&[("language", language)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api(status.as_u16(), body));
        }

        response
            .json::<Transcript>()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))
    }

    async fn ready(&self) -> bool {
        probe_health(&self.client, &self.base_url).await
    }
}

/// Diarization sidecar client
pub struct SidecarDiarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl SidecarDiarizer {
    pub fn new(base_url: String, model: String) -> Result<Self, EngineError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl Diarizer for SidecarDiarizer {
    async fn diarize(&self, audio_path: &Path) -> Result<Diarization, EngineError> {
        let audio = read_audio(audio_path).await?;

        let response = self
            .client
            .post(format!("{}/v1/diarize", self.base_url))
            .query(&[("model", self.model.as_str())])
            .header("Content-Type", "application/octet-stream")
            .body(audio)
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api(status.as_u16(), body));
        }

        response
            .json::<Diarization>()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))
    }

    async fn ready(&self) -> bool {
        probe_health(&self.client, &self.base_url).await
    }
}
