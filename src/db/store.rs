use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{
    Application, ApplicationLogEntry, Job, JobFilter, JobStatus, NewApplication, NewJob,
};
use crate::domain::job::default_limit;
use crate::error::PipelineError;

/// Offset pagination for listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            skip: 0,
        }
    }
}

/// Persistent store for jobs and applications.
///
/// Implementations enforce the lifecycle invariants themselves: status
/// changes are compare-and-set against the allowed predecessors, and an
/// application can only be created for a job that is TAILORED or later.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check for health checks.
    async fn ping(&self) -> Result<(), PipelineError>;

    /// Insert a DISCOVERED job. Fails with `Duplicate` when the
    /// `(platform, platform_job_id)` pair already exists.
    async fn create_job(&self, job: &NewJob) -> Result<Job, PipelineError>;

    async fn get_job(&self, id: i64) -> Result<Job, PipelineError>;

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, PipelineError>;

    async fn record_fit(&self, id: i64, score: u8, reasoning: &str) -> Result<(), PipelineError>;

    /// Move a job forward to `to`, failing with `InvalidTransition` if its
    /// current status is not an allowed predecessor.
    async fn advance_status(&self, id: i64, to: JobStatus) -> Result<Job, PipelineError>;

    async fn create_application(&self, app: &NewApplication) -> Result<Application, PipelineError>;

    async fn get_application(&self, id: i64) -> Result<Application, PipelineError>;

    async fn list_applications(&self, page: Pagination) -> Result<Vec<Application>, PipelineError>;

    async fn applications_for_job(&self, job_id: i64) -> Result<Vec<Application>, PipelineError>;

    async fn append_application_logs(
        &self,
        id: i64,
        entries: &[ApplicationLogEntry],
    ) -> Result<(), PipelineError>;

    /// Stamp `submitted_at`; refuses an application that was already submitted.
    async fn mark_submitted(
        &self,
        id: i64,
        screenshot_path: Option<&str>,
    ) -> Result<Application, PipelineError>;
}
