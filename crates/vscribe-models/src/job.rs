//! Transcription job records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the identifier is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Persisted job status.
///
/// `Done` and `Failed` are terminal. `Processing` exists in the schema but the
/// worker never writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job created, waiting for a worker
    #[default]
    Pending,
    /// Job picked up by a worker
    Processing,
    /// Transcript stored
    Done,
    /// Job failed with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// A transcription job as stored in the jobs table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Current status
    pub status: JobStatus,

    /// Transcript text, set once the job is done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Error message, set when the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            transcript: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a terminal update and bump `updated_at`.
    ///
    /// Done clears any previous error; Failed keeps an earlier transcript.
    pub fn apply(&mut self, update: &JobUpdate) {
        match update {
            JobUpdate::Done { transcript } => {
                self.transcript = Some(transcript.clone());
                self.error = None;
            }
            JobUpdate::Failed { error } => {
                self.error = Some(error.clone());
            }
        }
        self.status = update.status();
        self.updated_at = Utc::now();
    }

    /// Check the status/transcript/error invariant.
    pub fn is_consistent(&self) -> bool {
        let has_transcript = self
            .transcript
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());

        match self.status {
            JobStatus::Done => has_transcript && self.error.is_none(),
            JobStatus::Failed => self.error.is_some(),
            JobStatus::Pending | JobStatus::Processing => true,
        }
    }
}

/// Terminal status write issued by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobUpdate {
    /// Transcription succeeded.
    Done { transcript: String },
    /// Transcription failed.
    Failed { error: String },
}

impl JobUpdate {
    pub fn done(transcript: impl Into<String>) -> Self {
        Self::Done {
            transcript: transcript.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// The status this update writes. Always terminal.
    pub fn status(&self) -> JobStatus {
        match self {
            JobUpdate::Done { .. } => JobStatus::Done,
            JobUpdate::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn transcript(&self) -> Option<&str> {
        match self {
            JobUpdate::Done { transcript } => Some(transcript),
            JobUpdate::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobUpdate::Done { .. } => None,
            JobUpdate::Failed { error } => Some(error),
        }
    }
}
