//! Human approval checkpoint in front of every submission.

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PipelineError;

pub use postgres::PgApprovalStore;
pub use store::{ApprovalStore, ApprovalTicket, Resolution};

/// How a wait at the gate ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved,
    Rejected,
    /// The waiter was cancelled before anyone answered. Never counts as approval.
    Cancelled,
}

impl ApprovalOutcome {
    pub fn is_approved(self) -> bool {
        matches!(self, ApprovalOutcome::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalOutcome::Approved => "approved",
            ApprovalOutcome::Rejected => "rejected",
            ApprovalOutcome::Cancelled => "cancelled",
        }
    }
}

impl From<Resolution> for ApprovalOutcome {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Approved => ApprovalOutcome::Approved,
            Resolution::Rejected => ApprovalOutcome::Rejected,
        }
    }
}

#[derive(Clone)]
pub struct ApprovalGate {
    store: Arc<dyn ApprovalStore>,
    poll_interval: Duration,
}

impl ApprovalGate {
    pub fn new(store: Arc<dyn ApprovalStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    /// Open a ticket for `job_id` and wait until an operator answers it.
    ///
    /// There is no timeout. Cancelling `cancel` ends the wait with
    /// [`ApprovalOutcome::Cancelled`] and withdraws the ticket.
    pub async fn request_approval(
        &self,
        job_id: i64,
        context: Value,
        cancel: &CancellationToken,
    ) -> Result<ApprovalOutcome, PipelineError> {
        let generation = self.store.open(job_id, &context).await?;
        info!(job_id, generation, "Waiting for approval");

        loop {
            if let Some(resolution) = self.store.take(job_id, generation).await? {
                info!(job_id, generation, %resolution, "Approval resolved");
                return Ok(resolution.into());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(job_id, generation, "Approval wait cancelled");
                    self.store.abandon(job_id, generation).await?;
                    return Ok(ApprovalOutcome::Cancelled);
                }
                _ = self.store.changed(job_id, self.poll_interval) => {
                    debug!(job_id, generation, "Re-checking approval");
                }
            }
        }
    }

    pub async fn approve(&self, job_id: i64) -> Result<(), PipelineError> {
        let generation = self.store.resolve(job_id, Resolution::Approved).await?;
        info!(job_id, generation, "Job approved by operator");
        Ok(())
    }

    pub async fn reject(&self, job_id: i64) -> Result<(), PipelineError> {
        let generation = self.store.resolve(job_id, Resolution::Rejected).await?;
        info!(job_id, generation, "Job rejected by operator");
        Ok(())
    }

    pub async fn pending(&self) -> Result<Vec<ApprovalTicket>, PipelineError> {
        self.store.pending().await
    }
}
