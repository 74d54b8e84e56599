//! Queue message payload.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::job::JobId;

/// Message pushed onto the job queue by the backend.
///
/// Only `jobId` is read; any other fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
}

impl JobMessage {
    pub fn new(job_id: JobId) -> Self {
        Self { job_id }
    }

    /// Decode a raw queue payload.
    pub fn from_json(payload: &str) -> ModelResult<Self> {
        let message: JobMessage = serde_json::from_str(payload)?;
        if message.job_id.is_blank() {
            return Err(ModelError::invalid_message("jobId is empty"));
        }
        Ok(message)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
