use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::agent::{SubmissionController, SubmissionOutcome};
use crate::error::PipelineError;
use crate::queue::ApplyQueue;

/// Background worker submitting tailored applications
pub struct ApplyWorker {
    queue: ApplyQueue,
    controller: Arc<SubmissionController>,
    dequeue_timeout: Duration,
}

impl ApplyWorker {
    pub fn new(queue: ApplyQueue, controller: Arc<SubmissionController>, dequeue_timeout: Duration) -> Self {
        Self {
            queue,
            controller,
            dequeue_timeout,
        }
    }

    /// Same loop as the intake worker, plus `cancel`, which is handed to the
    /// controller so that a pending approval wait ends on shutdown.
    ///
    /// `semaphore` must belong to the apply stage alone: a permit is held
    /// across the approval wait, which lasts as long as the operator takes.
    pub async fn run(
        &self,
        worker_id: u32,
        semaphore: Arc<Semaphore>,
        shutdown_rx: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) {
        info!("Apply worker {} started", worker_id);

        while !*shutdown_rx.borrow() && !cancel.is_cancelled() {
            if let Err(e) = self.tick(worker_id, &semaphore, &cancel).await {
                error!("Apply worker {} encountered queue error: {:?}", worker_id, e);
                sleep(Duration::from_secs(1)).await;
            }
        }

        info!("Apply worker {} stopped", worker_id);
    }

    /// Handle at most one application. Nothing is popped once `cancel` has
    /// fired, so a cancelled worker never consumes an entry it cannot finish.
    pub async fn tick(
        &self,
        worker_id: u32,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Result<bool, PipelineError> {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Apply worker {} failed to acquire semaphore: {:?}", worker_id, e);
                return Ok(false);
            }
        };
        if cancel.is_cancelled() {
            return Ok(false);
        }

        let Some(application_id) = self.queue.pop(self.dequeue_timeout).await? else {
            return Ok(false);
        };

        info!(worker_id, application_id, "Apply worker picked up application");

        match self.controller.process(application_id, cancel).await {
            Ok(SubmissionOutcome::Submitted { screenshot_path }) => {
                info!(worker_id, application_id, ?screenshot_path, "Submission finished")
            }
            Ok(SubmissionOutcome::Skipped(reason)) => {
                info!(worker_id, application_id, reason = reason.as_str(), "Submission skipped")
            }
            Ok(SubmissionOutcome::AlreadySubmitted) => {}
            Err(e) => error!(worker_id, application_id, "Application dropped: {}", e),
        }

        drop(permit);
        Ok(true)
    }
}
