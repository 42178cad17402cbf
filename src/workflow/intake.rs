use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};
use validator::Validate;

use crate::analytics::{AnalyticsSink, Event};
use crate::artifacts::ArtifactWriter;
use crate::db::Store;
use crate::domain::{ApplicationLogEntry, IntakeItem, JobStatus, NewApplication, NewJob, UserProfile};
use crate::error::PipelineError;
use crate::queue::ApplyQueue;
use crate::workflow::{FitWorkflow, WorkflowOutcome};

/// Log kind stamped on an application whose apply-queue push failed.
pub const ENQUEUE_FAILED: &str = "enqueue_failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Tailored { job_id: i64, application_id: i64 },
    Rejected { job_id: i64 },
}

/// Turns a raw posting into a persisted job and, when it fits, an
/// application waiting on the apply queue.
pub struct IntakePipeline {
    store: Arc<dyn Store>,
    workflow: FitWorkflow,
    artifacts: ArtifactWriter,
    apply_queue: ApplyQueue,
    analytics: Arc<dyn AnalyticsSink>,
    profile: Arc<UserProfile>,
}

impl IntakePipeline {
    pub fn new(
        store: Arc<dyn Store>,
        workflow: FitWorkflow,
        artifacts: ArtifactWriter,
        apply_queue: ApplyQueue,
        analytics: Arc<dyn AnalyticsSink>,
        profile: Arc<UserProfile>,
    ) -> Self {
        Self {
            store,
            workflow,
            artifacts,
            apply_queue,
            analytics,
            profile,
        }
    }

    /// A failed workflow, or a failure writing the artifacts, leaves the job
    /// DISCOVERED with no application. If only the apply-queue push fails the
    /// job is TAILORED and its application carries an `enqueue_failed` log
    /// entry until it is requeued.
    pub async fn process(&self, item: IntakeItem) -> Result<IntakeOutcome, PipelineError> {
        item.validate()
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        let job = self.store.create_job(&NewJob::from(item)).await?;
        info!(job_id = job.id, title = %job.title, company = %job.company, "Job discovered");
        self.analytics
            .emit(
                Event::JobDiscovered,
                json!({"job_id": job.id, "platform": job.platform, "title": job.title, "company": job.company}),
            )
            .await;

        let run = match self.workflow.run(job.clone(), self.profile.clone()).await {
            Ok(run) => run,
            Err(e) => {
                warn!(job_id = job.id, "Workflow aborted, job stays DISCOVERED: {}", e);
                return Err(e.into());
            }
        };

        let fit = run.outcome.fit();
        self.store
            .record_fit(job.id, fit.score, &fit.reasoning)
            .await?;
        self.analytics
            .emit(
                Event::JobAnalyzed,
                json!({
                    "job_id": job.id,
                    "score": fit.score,
                    "threshold": self.workflow.threshold(),
                    "decision": run.outcome.decision(),
                }),
            )
            .await;

        match run.outcome {
            WorkflowOutcome::Tailored { fit, content } => {
                let written = self
                    .artifacts
                    .write_application(&job, &self.profile, &content)
                    .await?;
                self.store.advance_status(job.id, JobStatus::Tailored).await?;
                let application = self
                    .store
                    .create_application(&NewApplication {
                        job_id: job.id,
                        resume_path: written.resume_path,
                        cover_letter_path: written.cover_letter_path,
                    })
                    .await?;
                if let Err(e) = self.apply_queue.push(application.id).await {
                    self.mark_unqueued(application.id, &e).await;
                    return Err(e);
                }

                info!(job_id = job.id, application_id = application.id, score = fit.score, "Application queued");
                self.analytics
                    .emit(
                        Event::ApplicationGenerated,
                        json!({"job_id": job.id, "application_id": application.id, "score": fit.score}),
                    )
                    .await;
                Ok(IntakeOutcome::Tailored {
                    job_id: job.id,
                    application_id: application.id,
                })
            }
            WorkflowOutcome::Rejected { fit } => {
                self.store.advance_status(job.id, JobStatus::Rejected).await?;
                info!(job_id = job.id, score = fit.score, "Job rejected");
                self.analytics
                    .emit(Event::JobRejected, json!({"job_id": job.id, "score": fit.score}))
                    .await;
                Ok(IntakeOutcome::Rejected { job_id: job.id })
            }
        }
    }

    /// Leave a trace on an application that never reached the apply queue,
    /// so it can be found and requeued.
    async fn mark_unqueued(&self, application_id: i64, err: &PipelineError) {
        warn!(application_id, "Application created but not queued: {}", err);
        let entry = ApplicationLogEntry::new(ENQUEUE_FAILED, json!({"error": err.to_string()}));
        if let Err(e) = self
            .store
            .append_application_logs(application_id, &[entry])
            .await
        {
            error!(application_id, "Failed to record enqueue failure: {}", e);
        }
    }
}
