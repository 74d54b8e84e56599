//! Worker error types.

use thiserror::Error;

use vscribe_models::JobId;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{provider}: {message}")]
    Provider { provider: String, message: String },

    #[error(
        "All transcription services failed. Last error: {}",
        .failures.last().map(String::as_str).unwrap_or("no provider attempted")
    )]
    TranscriptionFailed { failures: Vec<String> },

    #[error("Empty transcript received for job {0}")]
    EmptyTranscript(JobId),

    #[error("{0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(#[from] vscribe_store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] vscribe_queue::QueueError),

    #[error("Provider error: {0}")]
    ProviderClient(#[from] vscribe_providers::ProviderError),
}

impl WorkerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Startup errors that should stop the process.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WorkerError::Configuration(_)
                | WorkerError::ProviderClient(vscribe_providers::ProviderError::Config(_))
        )
    }

    /// Provider failure messages collected by the fallback chain.
    pub fn failures(&self) -> &[String] {
        match self {
            WorkerError::TranscriptionFailed { failures } => failures,
            _ => &[],
        }
    }
}
