use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::db::application_repository::ApplicationRepository;
use crate::db::job_repository::JobRepository;
use crate::db::store::{Pagination, Store};
use crate::domain::{
    Application, ApplicationLogEntry, Job, JobFilter, JobStatus, NewApplication, NewJob,
};
use crate::error::PipelineError;

/// PostgreSQL-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), PipelineError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_job(&self, job: &NewJob) -> Result<Job, PipelineError> {
        JobRepository::create(&self.pool, job).await
    }

    async fn get_job(&self, id: i64) -> Result<Job, PipelineError> {
        JobRepository::find(&self.pool, id).await
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, PipelineError> {
        JobRepository::list(&self.pool, filter).await
    }

    async fn record_fit(&self, id: i64, score: u8, reasoning: &str) -> Result<(), PipelineError> {
        JobRepository::record_fit(&self.pool, id, score, reasoning).await
    }

    async fn advance_status(&self, id: i64, to: JobStatus) -> Result<Job, PipelineError> {
        JobRepository::advance_status(&self.pool, id, to).await
    }

    async fn create_application(&self, app: &NewApplication) -> Result<Application, PipelineError> {
        ApplicationRepository::create(&self.pool, app).await
    }

    async fn get_application(&self, id: i64) -> Result<Application, PipelineError> {
        ApplicationRepository::find(&self.pool, id).await
    }

    async fn list_applications(&self, page: Pagination) -> Result<Vec<Application>, PipelineError> {
        ApplicationRepository::list(&self.pool, page).await
    }

    async fn applications_for_job(&self, job_id: i64) -> Result<Vec<Application>, PipelineError> {
        ApplicationRepository::for_job(&self.pool, job_id).await
    }

    async fn append_application_logs(
        &self,
        id: i64,
        entries: &[ApplicationLogEntry],
    ) -> Result<(), PipelineError> {
        ApplicationRepository::append_logs(&self.pool, id, entries).await
    }

    async fn mark_submitted(
        &self,
        id: i64,
        screenshot_path: Option<&str>,
    ) -> Result<Application, PipelineError> {
        ApplicationRepository::mark_submitted(&self.pool, id, screenshot_path).await
    }
}
