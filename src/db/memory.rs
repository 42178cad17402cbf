//! In-process [`Store`] used by tests. Mirrors the SQL constraints.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::db::store::{Pagination, Store};
use crate::domain::{
    Application, ApplicationLogEntry, Job, JobFilter, JobStatus, NewApplication, NewJob,
};
use crate::error::PipelineError;

#[derive(Default)]
struct Tables {
    jobs: Vec<Job>,
    applications: Vec<Application>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, skip: i64, limit: i64) -> Vec<T> {
    items
        .skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn create_job(&self, job: &NewJob) -> Result<Job, PipelineError> {
        let mut tables = self.tables.lock().await;
        if tables
            .jobs
            .iter()
            .any(|j| j.platform == job.platform && j.platform_job_id == job.platform_job_id)
        {
            return Err(PipelineError::Duplicate {
                platform: job.platform.clone(),
                platform_job_id: job.platform_job_id.clone(),
            });
        }

        let now = Utc::now();
        let created = Job {
            id: tables.jobs.len() as i64 + 1,
            platform: job.platform.clone(),
            platform_job_id: job.platform_job_id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            url: job.url.clone(),
            description: job.description.clone(),
            fit_score: None,
            fit_reasoning: None,
            status: JobStatus::Discovered,
            requires_sponsorship: job.requires_sponsorship,
            created_at: now,
            updated_at: now,
        };
        tables.jobs.push(created.clone());
        Ok(created)
    }

    async fn get_job(&self, id: i64) -> Result<Job, PipelineError> {
        let tables = self.tables.lock().await;
        tables
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("job", id))
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, PipelineError> {
        let tables = self.tables.lock().await;
        let matching = tables
            .jobs
            .iter()
            .rev()
            .filter(|j| filter.status.map_or(true, |s| j.status == s))
            .cloned();
        Ok(page(matching, filter.skip, filter.limit))
    }

    async fn record_fit(&self, id: i64, score: u8, reasoning: &str) -> Result<(), PipelineError> {
        let mut tables = self.tables.lock().await;
        let job = tables
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| PipelineError::not_found("job", id))?;
        job.fit_score = Some(score);
        job.fit_reasoning = Some(reasoning.to_string());
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn advance_status(&self, id: i64, to: JobStatus) -> Result<Job, PipelineError> {
        let mut tables = self.tables.lock().await;
        let job = tables
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| PipelineError::not_found("job", id))?;
        if !job.status.can_advance_to(to) {
            return Err(PipelineError::InvalidTransition {
                job_id: id,
                from: job.status,
                to,
            });
        }
        job.status = to;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn create_application(&self, app: &NewApplication) -> Result<Application, PipelineError> {
        let mut tables = self.tables.lock().await;
        let job = tables
            .jobs
            .iter()
            .find(|j| j.id == app.job_id)
            .ok_or_else(|| PipelineError::not_found("job", app.job_id))?;
        if !job.status.allows_application() {
            return Err(PipelineError::InvalidInput(format!(
                "job {} is {}; applications require TAILORED or later",
                job.id, job.status
            )));
        }

        let created = Application {
            id: tables.applications.len() as i64 + 1,
            job_id: app.job_id,
            resume_path: app.resume_path.clone(),
            cover_letter_path: app.cover_letter_path.clone(),
            submitted_at: None,
            screenshot_path: None,
            logs: Vec::new(),
            created_at: Utc::now(),
        };
        tables.applications.push(created.clone());
        Ok(created)
    }

    async fn get_application(&self, id: i64) -> Result<Application, PipelineError> {
        let tables = self.tables.lock().await;
        tables
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("application", id))
    }

    async fn list_applications(&self, pagination: Pagination) -> Result<Vec<Application>, PipelineError> {
        let tables = self.tables.lock().await;
        Ok(page(
            tables.applications.iter().rev().cloned(),
            pagination.skip,
            pagination.limit,
        ))
    }

    async fn applications_for_job(&self, job_id: i64) -> Result<Vec<Application>, PipelineError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .applications
            .iter()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn append_application_logs(
        &self,
        id: i64,
        entries: &[ApplicationLogEntry],
    ) -> Result<(), PipelineError> {
        let mut tables = self.tables.lock().await;
        let app = tables
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PipelineError::not_found("application", id))?;
        app.logs.extend_from_slice(entries);
        Ok(())
    }

    async fn mark_submitted(
        &self,
        id: i64,
        screenshot_path: Option<&str>,
    ) -> Result<Application, PipelineError> {
        let mut tables = self.tables.lock().await;
        let app = tables
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PipelineError::not_found("application", id))?;
        if app.submitted_at.is_some() {
            return Err(PipelineError::InvalidInput(format!(
                "application {id} was already submitted"
            )));
        }
        app.submitted_at = Some(Utc::now());
        if let Some(path) = screenshot_path {
            app.screenshot_path = Some(path.to_string());
        }
        Ok(app.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(id: &str) -> NewJob {
        NewJob {
            platform: "linkedin".into(),
            platform_job_id: id.into(),
            title: "Backend Engineer".into(),
            company: "Acme".into(),
            url: format!("https://jobs.example.com/{id}"),
            description: "Rust, PostgreSQL".into(),
            requires_sponsorship: false,
        }
    }

    #[tokio::test]
    async fn duplicate_identity_is_refused() {
        let store = MemoryStore::new();
        store.create_job(&new_job("1")).await.unwrap();
        let err = store.create_job(&new_job("1")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn status_never_regresses() {
        let store = MemoryStore::new();
        let job = store.create_job(&new_job("1")).await.unwrap();

        let err = store.advance_status(job.id, JobStatus::Applied).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition { from: JobStatus::Discovered, to: JobStatus::Applied, .. }
        ));

        store.advance_status(job.id, JobStatus::Tailored).await.unwrap();
        store.advance_status(job.id, JobStatus::Applied).await.unwrap();
        assert!(store.advance_status(job.id, JobStatus::Tailored).await.is_err());
        assert!(store.advance_status(job.id, JobStatus::Applied).await.is_err());
    }

    #[tokio::test]
    async fn application_requires_tailored_job() {
        let store = MemoryStore::new();
        let job = store.create_job(&new_job("1")).await.unwrap();
        let app = NewApplication {
            job_id: job.id,
            resume_path: "/tmp/r.md".into(),
            cover_letter_path: None,
        };

        assert!(store.create_application(&app).await.is_err());
        store.advance_status(job.id, JobStatus::Tailored).await.unwrap();
        assert!(store.create_application(&app).await.is_ok());
    }

    #[tokio::test]
    async fn submission_is_stamped_once() {
        let store = MemoryStore::new();
        let job = store.create_job(&new_job("1")).await.unwrap();
        store.advance_status(job.id, JobStatus::Tailored).await.unwrap();
        let app = store
            .create_application(&NewApplication {
                job_id: job.id,
                resume_path: "/tmp/r.md".into(),
                cover_letter_path: None,
            })
            .await
            .unwrap();

        let submitted = store.mark_submitted(app.id, Some("/tmp/s.png")).await.unwrap();
        assert!(submitted.is_submitted());
        assert_eq!(submitted.screenshot_path.as_deref(), Some("/tmp/s.png"));
        assert!(store.mark_submitted(app.id, None).await.is_err());
    }

    #[tokio::test]
    async fn list_jobs_filters_by_status() {
        let store = MemoryStore::new();
        let a = store.create_job(&new_job("a")).await.unwrap();
        store.create_job(&new_job("b")).await.unwrap();
        store.advance_status(a.id, JobStatus::Rejected).await.unwrap();

        let rejected = store
            .list_jobs(&JobFilter {
                status: Some(JobStatus::Rejected),
                limit: 10,
                skip: 0,
            })
            .await
            .unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].platform_job_id, "a");
    }
}
