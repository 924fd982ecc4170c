//! Durable job mirror contract.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::job::Job;

/// Optional durable mirror for job records.
///
/// The in-memory job map is authoritative while a run is active; a store
/// exists so jobs survive process restarts. Every call is best-effort
/// from the orchestrator's perspective: failures are logged and never
/// propagated as orchestration failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Record a freshly created job.
    async fn create_job(&self, job: &Job) -> StoreResult<()>;

    /// Overwrite the stored record with the job's current state.
    async fn update_job(&self, job: &Job) -> StoreResult<()>;

    /// Fetch a job by id.
    async fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// List stored jobs, most recently started first.
    async fn list_jobs(&self, limit: usize) -> StoreResult<Vec<Job>>;
}
