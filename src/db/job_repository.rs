use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::db::models::{JOB_COLUMNS, JobRow};
use crate::domain::{Job, JobFilter, JobStatus, NewJob};
use crate::error::PipelineError;

/// Repository for Job database operations
pub struct JobRepository;

impl JobRepository {
    /// Create a new job in the database and return the full job record
    pub async fn create(pool: &Pool<Postgres>, job: &NewJob) -> Result<Job, PipelineError> {
        debug!(
            "Creating job: platform={}, platform_job_id={}",
            job.platform, job.platform_job_id
        );

        let query = format!(
            "INSERT INTO jobs (platform, platform_job_id, title, company, url, description, requires_sponsorship)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {JOB_COLUMNS}"
        );

        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(&job.platform)
            .bind(&job.platform_job_id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.url)
            .bind(&job.description)
            .bind(job.requires_sponsorship)
            .fetch_one(pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(db) if db.is_unique_violation() => PipelineError::Duplicate {
                    platform: job.platform.clone(),
                    platform_job_id: job.platform_job_id.clone(),
                },
                other => PipelineError::Persistence(other),
            })?;

        debug!("Job created with id={}", row.id);
        Job::try_from(row)
    }

    pub async fn find(pool: &Pool<Postgres>, id: i64) -> Result<Job, PipelineError> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PipelineError::not_found("job", id))
            .and_then(Job::try_from)
    }

    /// Newest first, optionally narrowed to one status
    pub async fn list(pool: &Pool<Postgres>, filter: &JobFilter) -> Result<Vec<Job>, PipelineError> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM jobs
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(filter.status.map(JobStatus::as_str))
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    pub async fn record_fit(
        pool: &Pool<Postgres>,
        id: i64,
        score: u8,
        reasoning: &str,
    ) -> Result<(), PipelineError> {
        let result = sqlx::query(
            "UPDATE jobs SET fit_score = $2, fit_reasoning = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(i32::from(score))
        .bind(reasoning)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::not_found("job", id));
        }
        debug!("Recorded fit for job {}: score={}", id, score);
        Ok(())
    }

    /// Compare-and-set status update
    ///
    /// The UPDATE only matches while the row still holds one of the allowed
    /// predecessors of `to`, so concurrent writers cannot move a job backwards.
    pub async fn advance_status(
        pool: &Pool<Postgres>,
        id: i64,
        to: JobStatus,
    ) -> Result<Job, PipelineError> {
        let allowed: Vec<String> = to
            .predecessors()
            .iter()
            .map(|status| status.as_str().to_string())
            .collect();

        let query = format!(
            "UPDATE jobs SET status = $2, updated_at = NOW()
             WHERE id = $1 AND status = ANY($3)
             RETURNING {JOB_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(to.as_str())
            .bind(allowed)
            .fetch_optional(pool)
            .await?;

        match updated {
            Some(row) => {
                debug!("Job {} advanced to {}", id, to);
                Job::try_from(row)
            }
            None => {
                let current = Self::find(pool, id).await?;
                Err(PipelineError::InvalidTransition {
                    job_id: id,
                    from: current.status,
                    to,
                })
            }
        }
    }
}
