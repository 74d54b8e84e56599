//! Shared data models for the transcription worker.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their persisted lifecycle status
//! - Terminal status updates written by the worker
//! - The queue message payload

pub mod error;
pub mod job;
pub mod message;

pub use error::{ModelError, ModelResult};
pub use job::{Job, JobId, JobStatus, JobUpdate};
pub use message::JobMessage;
