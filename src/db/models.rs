use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

use crate::domain::{Application, ApplicationLogEntry, Job, JobStatus};
use crate::error::PipelineError;

/// Database representation of a job with all fields
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub platform: String,
    pub platform_job_id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    pub description: String,
    pub fit_score: Option<i32>,
    pub fit_reasoning: Option<String>,
    pub status: String,
    pub requires_sponsorship: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = PipelineError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row.status.parse().map_err(PipelineError::InvalidInput)?;
        let fit_score = row
            .fit_score
            .map(|score| {
                u8::try_from(score)
                    .map_err(|_| PipelineError::InvalidInput(format!("fit_score out of range: {score}")))
            })
            .transpose()?;

        Ok(Job {
            id: row.id,
            platform: row.platform,
            platform_job_id: row.platform_job_id,
            title: row.title,
            company: row.company,
            url: row.url,
            description: row.description,
            fit_score,
            fit_reasoning: row.fit_reasoning,
            status,
            requires_sponsorship: row.requires_sponsorship,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database representation of an application
#[derive(Debug, FromRow)]
pub struct ApplicationRow {
    pub id: i64,
    pub job_id: i64,
    pub resume_path: String,
    pub cover_letter_path: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub screenshot_path: Option<String>,
    pub logs: Json<Vec<ApplicationLogEntry>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Application {
            id: row.id,
            job_id: row.job_id,
            resume_path: row.resume_path,
            cover_letter_path: row.cover_letter_path,
            submitted_at: row.submitted_at,
            screenshot_path: row.screenshot_path,
            logs: row.logs.0,
            created_at: row.created_at,
        }
    }
}

pub(crate) const JOB_COLUMNS: &str = "id, platform, platform_job_id, title, company, url, description, \
     fit_score, fit_reasoning, status, requires_sponsorship, created_at, updated_at";

pub(crate) const APPLICATION_COLUMNS: &str =
    "id, job_id, resume_path, cover_letter_path, submitted_at, screenshot_path, logs, created_at";

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, fit_score: Option<i32>) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: 1,
            platform: "linkedin".into(),
            platform_job_id: "abc".into(),
            title: "Backend Engineer".into(),
            company: "Acme".into(),
            url: "https://jobs.example.com/abc".into(),
            description: "Rust".into(),
            fit_score,
            fit_reasoning: None,
            status: status.into(),
            requires_sponsorship: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn job_row_converts() {
        let job = Job::try_from(row("TAILORED", Some(85))).unwrap();
        assert_eq!(job.status, JobStatus::Tailored);
        assert_eq!(job.fit_score, Some(85));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Job::try_from(row("ARCHIVED", None)).is_err());
    }

    #[test]
    fn negative_score_is_rejected() {
        assert!(Job::try_from(row("DISCOVERED", Some(-1))).is_err());
    }
}
