//! Transcription provider clients.
//!
//! This crate provides:
//! - The `TranscriptionProvider` trait the fallback orchestrator drives
//! - A Supadata API client with async job polling
//! - A client for a local Whisper inference server
//! - Provider selection from configuration

pub mod error;
pub mod factory;
mod http;
pub mod provider;
pub mod supadata;
pub mod whisper;

pub use error::{ProviderError, ProviderResult};
pub use factory::build_providers;
pub use provider::{ProviderKind, TranscriptionProvider};
pub use supadata::{SupadataClient, SupadataConfig};
pub use whisper::{WhisperClient, WhisperConfig};
