//! Artifact persistence
//!
//! The three JSON artifacts for a job live under
//! `<output_root>/<user_id>/<job_id>_<kind>.json`. Writes go to a `.tmp`
//! sibling first and rename into place, so a reader never observes a partial
//! artifact. Paths recorded on the job row are relative to the output root.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The three artifact kinds persisted per job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Transcript,
    Diarization,
    Merged,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::Diarization => "diarization",
            ArtifactKind::Merged => "merged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transcript" => Some(ArtifactKind::Transcript),
            "diarization" => Some(ArtifactKind::Diarization),
            "merged" => Some(ArtifactKind::Merged),
            _ => None,
        }
    }
}

/// Artifact store rooted at the configured output directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path of one artifact; job ids make these non-colliding
    pub fn relative_path(&self, user_id: i64, job_id: Uuid, kind: ArtifactKind) -> PathBuf {
        PathBuf::from(user_id.to_string()).join(format!("{}_{}.json", job_id, kind.as_str()))
    }

    /// Absolute path from a stored relative path
    pub fn absolute_path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Write one artifact in full; returns its relative path
    pub async fn write_artifact<T: Serialize>(
        &self,
        user_id: i64,
        job_id: Uuid,
        kind: ArtifactKind,
        data: &T,
    ) -> Result<PathBuf> {
        let relative = self.relative_path(user_id, job_id, kind);
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_vec_pretty(data)?;

        // Write-then-rename keeps partial writes invisible
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to rename into {}", path.display()))?;

        Ok(relative)
    }

    /// Best-effort removal of one job's artifacts; reports files removed
    pub async fn remove_job_artifacts(&self, user_id: i64, job_id: Uuid) -> usize {
        let mut removed = 0;
        for kind in [
            ArtifactKind::Transcript,
            ArtifactKind::Diarization,
            ArtifactKind::Merged,
        ] {
            let path = self.root.join(self.relative_path(user_id, job_id, kind));
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to remove artifact {}: {}", path.display(), e);
                }
            }
        }
        removed
    }
}
