use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::db::job_repository::JobRepository;
use crate::db::models::{APPLICATION_COLUMNS, ApplicationRow};
use crate::db::store::Pagination;
use crate::domain::{Application, ApplicationLogEntry, NewApplication};
use crate::error::PipelineError;

/// Repository for Application database operations
pub struct ApplicationRepository;

impl ApplicationRepository {
    /// Insert an application for a job that is TAILORED or later
    ///
    /// The status check and the insert are one statement; if the job is
    /// missing or still DISCOVERED/REJECTED nothing is written.
    pub async fn create(
        pool: &Pool<Postgres>,
        app: &NewApplication,
    ) -> Result<Application, PipelineError> {
        debug!("Creating application for job {}", app.job_id);

        let query = format!(
            "INSERT INTO applications (job_id, resume_path, cover_letter_path)
             SELECT id, $2, $3 FROM jobs
             WHERE id = $1 AND status IN ('TAILORED', 'APPLIED', 'INTERVIEW')
             RETURNING {APPLICATION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(app.job_id)
            .bind(&app.resume_path)
            .bind(&app.cover_letter_path)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => {
                debug!("Application created with id={}", row.id);
                Ok(row.into())
            }
            None => {
                let job = JobRepository::find(pool, app.job_id).await?;
                Err(PipelineError::InvalidInput(format!(
                    "job {} is {}; applications require TAILORED or later",
                    job.id, job.status
                )))
            }
        }
    }

    pub async fn find(pool: &Pool<Postgres>, id: i64) -> Result<Application, PipelineError> {
        let query = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1");
        sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Application::from)
            .ok_or_else(|| PipelineError::not_found("application", id))
    }

    pub async fn list(
        pool: &Pool<Postgres>,
        page: Pagination,
    ) -> Result<Vec<Application>, PipelineError> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Application::from).collect())
    }

    pub async fn for_job(pool: &Pool<Postgres>, job_id: i64) -> Result<Vec<Application>, PipelineError> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE job_id = $1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Application::from).collect())
    }

    /// Append entries to the JSONB log array in place
    pub async fn append_logs(
        pool: &Pool<Postgres>,
        id: i64,
        entries: &[ApplicationLogEntry],
    ) -> Result<(), PipelineError> {
        if entries.is_empty() {
            return Ok(());
        }

        let result = sqlx::query("UPDATE applications SET logs = logs || $2::JSONB WHERE id = $1")
            .bind(id)
            .bind(Json(entries))
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::not_found("application", id));
        }
        debug!("Appended {} log entries to application {}", entries.len(), id);
        Ok(())
    }

    pub async fn mark_submitted(
        pool: &Pool<Postgres>,
        id: i64,
        screenshot_path: Option<&str>,
    ) -> Result<Application, PipelineError> {
        let query = format!(
            "UPDATE applications
             SET submitted_at = NOW(), screenshot_path = COALESCE($2, screenshot_path)
             WHERE id = $1 AND submitted_at IS NULL
             RETURNING {APPLICATION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(id)
            .bind(screenshot_path)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                Self::find(pool, id).await?;
                Err(PipelineError::InvalidInput(format!(
                    "application {id} was already submitted"
                )))
            }
        }
    }
}
