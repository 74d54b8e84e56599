//! Job store interface.

use async_trait::async_trait;

use vscribe_models::{Job, JobId, JobUpdate};

use crate::error::StoreResult;

/// Persistence for job state.
///
/// Implementations must be safe for concurrent use by every worker.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Resolve the source video URL for a job, if one is mapped.
    async fn get_video_url(&self, job_id: &JobId) -> StoreResult<Option<String>>;

    /// Write a terminal status.
    ///
    /// Returns `Ok(false)` when the write did not apply (for example no row
    /// matched the id).
    async fn update_status(&self, job_id: &JobId, update: &JobUpdate) -> StoreResult<bool>;

    /// Load the full job record.
    async fn get_job(&self, job_id: &JobId) -> StoreResult<Option<Job>>;

    /// Check backend connectivity.
    async fn ping(&self) -> StoreResult<()>;
}
