//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::payload::JobPayload;
use super::status::JobStatus;

/// A queued import, update or export.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Job type identifier (e.g., `"import"`, `"export"`).
    pub job_type: String,
    /// Job-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Result data on completion (JSON).
    pub result: Option<serde_json::Value>,
    /// Error message on failure.
    pub error_message: Option<String>,
    /// Current job status.
    pub status: JobStatus,
    /// Number of execution attempts.
    pub attempts: i32,
    /// Maximum allowed attempts.
    pub max_attempts: i32,
    /// Set when an abort was requested while the job was running.
    pub cancel_requested: bool,
    /// User who created the job.
    pub created_by: String,
    /// Worker ID that picked up the job.
    pub worker_id: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job started executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Check if the job can be retried.
    pub fn can_retry(&self) -> bool {
        !self.cancel_requested && self.attempts < self.max_attempts
    }

    /// Decode the typed payload.
    pub fn typed_payload(&self) -> Result<JobPayload, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Job type identifier.
    pub job_type: String,
    /// Job-specific payload.
    pub payload: serde_json::Value,
    /// Maximum retry attempts.
    pub max_attempts: i32,
    /// User who created the job.
    pub created_by: String,
}

impl CreateJob {
    /// Build a job from a typed payload.
    pub fn from_payload(
        payload: &JobPayload,
        max_attempts: i32,
        created_by: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            job_type: payload.job_type().to_string(),
            payload: serde_json::to_value(payload)?,
            max_attempts,
            created_by: created_by.into(),
        })
    }
}
