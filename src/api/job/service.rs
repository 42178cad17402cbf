use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use super::dto::{BulkEnqueueResponse, EnqueueResponse, ItemError, JobResponse};
use crate::api::error::ServiceError;
use crate::api::validation::field_messages;
use crate::db::Store;
use crate::domain::{IntakeItem, Job, JobFilter, JobStatus};
use crate::queue::RawJobQueue;

/// Intake and job lookups behind the `/jobs` routes
pub struct JobService {
    store: Arc<dyn Store>,
    raw_jobs: RawJobQueue,
}

impl JobService {
    pub fn new(store: Arc<dyn Store>, raw_jobs: RawJobQueue) -> Self {
        Self { store, raw_jobs }
    }

    /// Push one already-validated item onto the raw-jobs queue.
    ///
    /// Nothing is persisted here: the intake worker creates the job when it
    /// dequeues the item.
    pub async fn enqueue(&self, item: &IntakeItem) -> Result<EnqueueResponse, ServiceError> {
        info!(platform = %item.platform, platform_job_id = %item.platform_job_id, "Service: Enqueueing posting");

        self.raw_jobs.push(item).await?;
        let queue_depth = self.raw_jobs.depth().await?;

        Ok(EnqueueResponse {
            message: "Job queued for evaluation".to_string(),
            queue_depth,
        })
    }

    /// Validate each item on its own and enqueue only the valid ones.
    ///
    /// One bad item never rejects the whole batch.
    pub async fn bulk_enqueue(&self, items: Vec<IntakeItem>) -> Result<BulkEnqueueResponse, ServiceError> {
        info!("Service: Processing bulk intake for {} items", items.len());

        let mut enqueued = 0;
        let mut errors = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            if let Err(validation_errors) = item.validate() {
                warn!("Service: Validation failed for item {} ({})", index, item.platform_job_id);
                errors.push(ItemError {
                    index,
                    platform_job_id: item.platform_job_id,
                    errors: field_messages(&validation_errors)
                        .into_iter()
                        .flat_map(|(_, messages)| messages)
                        .collect(),
                });
                continue;
            }
            self.raw_jobs.push(&item).await?;
            enqueued += 1;
        }

        if errors.is_empty() {
            info!("Service: Bulk intake completed: {} items queued", enqueued);
        } else {
            warn!("Service: Bulk intake completed with {} validation errors", errors.len());
        }

        Ok(BulkEnqueueResponse {
            message: format!(
                "Bulk intake completed. {} queued, {} failed",
                enqueued,
                errors.len()
            ),
            enqueued,
            errors,
        })
    }

    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, ServiceError> {
        if filter.limit <= 0 || filter.skip < 0 {
            return Err(ServiceError::ValidationError(
                "limit must be positive and skip non-negative".to_string(),
            ));
        }
        Ok(self.store.list_jobs(filter).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Job, ServiceError> {
        Ok(self.store.get_job(id).await?)
    }

    /// Operator-driven move to INTERVIEW; only TAILORED or APPLIED jobs qualify.
    pub async fn mark_interview(&self, id: i64) -> Result<JobResponse, ServiceError> {
        let job = self.store.advance_status(id, JobStatus::Interview).await?;
        info!(job_id = id, "Service: Job moved to INTERVIEW");
        Ok(JobResponse {
            message: "Job marked as interview".to_string(),
            job,
        })
    }
}
