//! Provider construction from configuration.

use std::sync::Arc;

use tracing::info;

use crate::error::ProviderResult;
use crate::provider::{ProviderKind, TranscriptionProvider};
use crate::supadata::SupadataClient;
use crate::whisper::WhisperClient;

/// Build the configured providers, in fallback order, reading each client's
/// settings from the environment.
pub fn build_providers(kinds: &[ProviderKind]) -> ProviderResult<Vec<Arc<dyn TranscriptionProvider>>> {
    let mut providers: Vec<Arc<dyn TranscriptionProvider>> = Vec::with_capacity(kinds.len());

    for kind in kinds {
        let provider: Arc<dyn TranscriptionProvider> = match kind {
            ProviderKind::Supadata => Arc::new(SupadataClient::from_env()?),
            ProviderKind::Whisper => Arc::new(WhisperClient::from_env()?),
        };
        providers.push(provider);
    }

    info!(
        providers = ?kinds.iter().map(ProviderKind::as_str).collect::<Vec<_>>(),
        "Transcription providers configured"
    );
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_builds_from_defaults() {
        let providers = build_providers(&[ProviderKind::Whisper]).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name(), "whisper");
        assert_eq!(providers[0].kind(), ProviderKind::Whisper);
    }
}
