//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while transcribing with a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid video URL: {0}")]
    InvalidUrl(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Transcript job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Media too large: {size} bytes exceeds limit of {limit} bytes")]
    MediaTooLarge { size: u64, limit: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map an unsuccessful HTTP status to an error.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited,
            _ => Self::Api {
                status,
                message: message.into(),
            },
        }
    }

    /// Classify a transport error, separating timeouts.
    pub fn from_transport(err: reqwest::Error, what: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{} timed out", what))
        } else {
            Self::Network(err)
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited
            | ProviderError::Timeout(_)
            | ProviderError::Network(_) => true,
            ProviderError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
