//! Ordered provider fallback.
//!
//! Providers are tried once each, in configuration order. The first one to
//! return non-blank text wins; blank text and errors are recorded and the
//! next provider is tried. Nothing here touches persistent state.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use vscribe_providers::TranscriptionProvider;

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

pub struct FallbackOrchestrator {
    providers: Vec<Arc<dyn TranscriptionProvider>>,
}

impl FallbackOrchestrator {
    pub fn new(providers: Vec<Arc<dyn TranscriptionProvider>>) -> WorkerResult<Self> {
        if providers.is_empty() {
            return Err(WorkerError::configuration(
                "At least one transcription provider is required",
            ));
        }
        Ok(Self { providers })
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Transcribe `video_url` with the first provider that produces text.
    ///
    /// The returned transcript is trimmed and never empty.
    pub async fn transcribe(&self, video_url: &str) -> WorkerResult<String> {
        if video_url.trim().is_empty() {
            return Err(WorkerError::invalid_input("video URL is empty"));
        }

        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name();
            let started = Instant::now();
            let result = provider.transcribe(video_url).await;
            let elapsed = started.elapsed().as_secs_f64();

            match result {
                Ok(text) if !text.trim().is_empty() => {
                    let transcript = text.trim();
                    metrics::record_provider_attempt(name, "success", elapsed);
                    info!(
                        provider = name,
                        chars = transcript.len(),
                        "Transcription succeeded"
                    );
                    return Ok(transcript.to_string());
                }
                Ok(_) => {
                    metrics::record_provider_attempt(name, "empty", elapsed);
                    warn!(provider = name, "Provider returned an empty transcript");
                    failures.push(format!("{} returned an empty transcript", name));
                }
                Err(e) => {
                    metrics::record_provider_attempt(name, "error", elapsed);
                    warn!(
                        provider = name,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Transcription provider failed"
                    );
                    failures.push(WorkerError::provider(name, e.to_string()).to_string());
                }
            }
        }

        error!(attempts = failures.len(), "All transcription providers failed");
        Err(WorkerError::TranscriptionFailed { failures })
    }
}
