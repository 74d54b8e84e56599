//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection pool closed")]
    Closed,

    #[error("Invalid payload {payload:?}: {reason}")]
    InvalidPayload { payload: String, reason: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Model error: {0}")]
    Model(#[from] vscribe_models::ModelError),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn invalid_payload(payload: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPayload {
            payload: payload.into(),
            reason: reason.to_string(),
        }
    }

    /// True if the message itself was bad. The backend is healthy and the
    /// caller should move on without backing off.
    pub fn is_invalid_payload(&self) -> bool {
        matches!(self, QueueError::InvalidPayload { .. })
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            QueueError::ConnectionFailed(_) => "connection",
            QueueError::Closed => "closed",
            QueueError::InvalidPayload { .. } => "invalid_payload",
            QueueError::Redis(_) => "redis",
            QueueError::Model(_) => "model",
        }
    }
}
