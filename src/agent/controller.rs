use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::action_loop::{ActionLoop, Documents, LoopReport};
use crate::analytics::{AnalyticsSink, Event};
use crate::approval::{ApprovalGate, ApprovalOutcome};
use crate::artifacts::ArtifactWriter;
use crate::browser::{DriverFactory, PageDriver};
use crate::db::Store;
use crate::domain::{Application, ApplicationLogEntry, Job, JobStatus, UserProfile};
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Submitted { screenshot_path: Option<String> },
    Skipped(ApprovalOutcome),
    AlreadySubmitted,
}

/// Runs one application from the apply queue through the browser and the
/// approval gate.
pub struct SubmissionController {
    store: Arc<dyn Store>,
    drivers: Arc<dyn DriverFactory>,
    action_loop: ActionLoop,
    gate: ApprovalGate,
    artifacts: ArtifactWriter,
    analytics: Arc<dyn AnalyticsSink>,
    profile: Arc<UserProfile>,
}

impl SubmissionController {
    pub fn new(
        store: Arc<dyn Store>,
        drivers: Arc<dyn DriverFactory>,
        action_loop: ActionLoop,
        gate: ApprovalGate,
        artifacts: ArtifactWriter,
        analytics: Arc<dyn AnalyticsSink>,
        profile: Arc<UserProfile>,
    ) -> Self {
        Self {
            store,
            drivers,
            action_loop,
            gate,
            artifacts,
            analytics,
            profile,
        }
    }

    pub async fn process(
        &self,
        application_id: i64,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome, PipelineError> {
        let application = self.store.get_application(application_id).await?;
        if application.is_submitted() {
            info!(application_id, "Application already submitted, skipping");
            return Ok(SubmissionOutcome::AlreadySubmitted);
        }
        let job = self.store.get_job(application.job_id).await?;

        let driver = self.drivers.open().await?;
        let mut log = Vec::new();
        let result = self
            .drive(&*driver, &job, &application, cancel, &mut log)
            .await;

        if let Err(e) = driver.close().await {
            warn!(application_id, "Failed to close browser session: {}", e);
        }
        if let Err(e) = &result {
            log.push(ApplicationLogEntry::new("error", json!({"error": e.to_string()})));
        }
        self.store
            .append_application_logs(application.id, &log)
            .await?;

        result
    }

    async fn drive(
        &self,
        driver: &dyn PageDriver,
        job: &Job,
        application: &Application,
        cancel: &CancellationToken,
        log: &mut Vec<ApplicationLogEntry>,
    ) -> Result<SubmissionOutcome, PipelineError> {
        let LoopReport {
            outcome,
            log: steps,
        } = self
            .action_loop
            .run(
                driver,
                &job.url,
                &self.profile.form_context(),
                &Documents::from(application),
                cancel,
            )
            .await;
        log.extend(steps);

        let context = json!({
            "application_id": application.id,
            "title": job.title,
            "company": job.company,
            "url": job.url,
            "loop_outcome": outcome.label(),
            "steps": outcome.steps(),
        });
        let decision = self.gate.request_approval(job.id, context, cancel).await?;
        log.push(ApplicationLogEntry::new(
            "approval",
            json!({"decision": decision.as_str()}),
        ));

        if !decision.is_approved() {
            info!(job_id = job.id, decision = decision.as_str(), "Skipping submission");
            self.analytics
                .emit(
                    Event::ApplicationSkipped,
                    json!({"job_id": job.id, "application_id": application.id, "reason": decision.as_str()}),
                )
                .await;
            return Ok(SubmissionOutcome::Skipped(decision));
        }

        let screenshot_path = self.final_screenshot(driver, job.id).await;
        self.store
            .mark_submitted(application.id, screenshot_path.as_deref())
            .await?;
        match self.store.advance_status(job.id, JobStatus::Applied).await {
            Ok(_) => {}
            Err(PipelineError::InvalidTransition { from, .. }) => {
                warn!(job_id = job.id, %from, "Job not moved to APPLIED");
            }
            Err(e) => return Err(e),
        }

        info!(job_id = job.id, application_id = application.id, "Application submitted");
        log.push(ApplicationLogEntry::new(
            "submitted",
            json!({"screenshot_path": screenshot_path}),
        ));
        self.analytics
            .emit(
                Event::ApplicationSubmitted,
                json!({"job_id": job.id, "application_id": application.id}),
            )
            .await;

        Ok(SubmissionOutcome::Submitted { screenshot_path })
    }

    /// Best effort: a missing screenshot never blocks submission.
    async fn final_screenshot(&self, driver: &dyn PageDriver, job_id: i64) -> Option<String> {
        let state = match driver.capture_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!(job_id, "Could not capture final screenshot: {}", e);
                return None;
            }
        };
        match self.artifacts.save_screenshot(job_id, &state.screenshot).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(job_id, "Could not save final screenshot: {}", e);
                None
            }
        }
    }
}
