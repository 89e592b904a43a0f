//! Configuration loading for scribe
//!
//! Resolution order per field: environment variable (`SCRIBE_*`) → TOML
//! config file → compiled default. The engine model identifiers are passed
//! through to the inference sidecars untouched; they do not change service
//! behavior.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_bind_addr() -> String {
    "127.0.0.1:5730".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("scribe.db")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_transcriber_url() -> String {
    "http://127.0.0.1:5731".to_string()
}

fn default_diarizer_url() -> String {
    "http://127.0.0.1:5732".to_string()
}

fn default_transcriber_model() -> String {
    "base".to_string()
}

fn default_diarizer_model() -> String {
    "speaker-diarization-3.1".to_string()
}

fn default_webhook_timeout_secs() -> u64 {
    30
}

/// Service settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// HTTP listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Root directory for persisted job artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Base URL of the transcription inference sidecar
    #[serde(default = "default_transcriber_url")]
    pub transcriber_url: String,

    /// Base URL of the diarization inference sidecar
    #[serde(default = "default_diarizer_url")]
    pub diarizer_url: String,

    /// Transcription model identifier, forwarded to the sidecar
    #[serde(default = "default_transcriber_model")]
    pub transcriber_model: String,

    /// Diarization model identifier, forwarded to the sidecar
    #[serde(default = "default_diarizer_model")]
    pub diarizer_model: String,

    /// Timeout for a single webhook POST
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        // serde defaults double as compiled defaults
        toml::from_str("").expect("empty settings parse")
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply env overrides
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("Failed to read config {}: {}", path.display(), e)
                })?;
                toml::from_str(&content).map_err(|e| {
                    anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e)
                })?
            }
            None => Settings::default(),
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Environment variables take priority over the TOML file
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SCRIBE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SCRIBE_TRANSCRIBER_URL") {
            self.transcriber_url = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_DIARIZER_URL") {
            self.diarizer_url = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_TRANSCRIBER_MODEL") {
            self.transcriber_model = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_DIARIZER_MODEL") {
            self.diarizer_model = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_WEBHOOK_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.webhook_timeout_secs = secs;
            }
        }
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }
}
