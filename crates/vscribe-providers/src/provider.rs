//! Provider interface and selection.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderResult};

/// Supported transcription backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Supadata hosted transcript API
    Supadata,
    /// Local Whisper inference server
    Whisper,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Supadata => "supadata",
            ProviderKind::Whisper => "whisper",
        }
    }

    /// Parse an ordered, comma-separated provider list such as
    /// `"supadata,whisper"`.
    pub fn parse_list(s: &str) -> ProviderResult<Vec<ProviderKind>> {
        let mut kinds = Vec::new();
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let kind: ProviderKind = name.parse()?;
            if kinds.contains(&kind) {
                return Err(ProviderError::config(format!(
                    "Provider '{}' listed more than once",
                    kind
                )));
            }
            kinds.push(kind);
        }

        if kinds.is_empty() {
            return Err(ProviderError::config("No transcription providers configured"));
        }
        Ok(kinds)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supadata" => Ok(ProviderKind::Supadata),
            "whisper" => Ok(ProviderKind::Whisper),
            other => Err(ProviderError::config(format!(
                "Unknown transcription provider: {}",
                other
            ))),
        }
    }
}

/// A single external transcription backend.
///
/// Implementations return whatever text the backend produced, possibly
/// empty; deciding whether a result is usable is left to the caller.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Name used in logs, metrics and failure messages.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Transcribe the video at `video_url`.
    async fn transcribe(&self, video_url: &str) -> ProviderResult<String>;
}
