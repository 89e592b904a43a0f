//! Job record and processing-state machine
//!
//! A job progresses pending → processing → {completed | failed}. The two end
//! states are terminal: any further transition attempt is an error, never a
//! silent overwrite. The orchestrator is the only writer of status, stage
//! timestamps, and artifact paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Record created, pipeline not yet started
    Pending,
    /// Pipeline running
    Processing,
    /// All stages finished (webhook outcome does not matter)
    Completed,
    /// A stage failed; error_message holds the captured text
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// True for completed/failed: no further status mutation allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Legal transitions: pending → processing → {completed | failed}
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stages with a completion timestamp on the job row
///
/// Each stage column is settable exactly once; the setters in `db::jobs`
/// refuse a second write rather than moving a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    Transcription,
    Diarization,
    Merge,
    Webhook,
}

impl Stage {
    /// Column holding this stage's completion timestamp
    pub fn column(&self) -> &'static str {
        match self {
            Stage::Upload => "upload_at",
            Stage::Transcription => "transcribed_at",
            Stage::Diarization => "diarized_at",
            Stage::Merge => "merged_at",
            Stage::Webhook => "webhook_at",
        }
    }
}

/// One audio-processing request and its tracked lifecycle
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub user_id: i64,

    // Input descriptors
    pub original_filename: String,
    pub file_size: i64,
    pub content_type: String,
    pub language: String,
    pub webhook_url: Option<String>,

    pub status: String,
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    // Stage completion timestamps, each set at most once
    pub upload_at: Option<DateTime<Utc>>,
    pub transcribed_at: Option<DateTime<Utc>>,
    pub diarized_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub webhook_at: Option<DateTime<Utc>>,

    // Artifact paths relative to the output root, set after successful save
    pub transcript_path: Option<String>,
    pub diarization_path: Option<String>,
    pub merged_path: Option<String>,

    // Webhook outcome
    pub webhook_delivered: bool,
    pub webhook_attempts: i64,
    pub webhook_last_attempt: Option<DateTime<Utc>>,
    pub webhook_error: Option<String>,
}

impl Job {
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::parse(&self.status)
    }
}
