use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::PipelineError;

/// Operator decision on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    Approved,
    Rejected,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Approved => "APPROVED",
            Resolution::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(Resolution::Approved),
            "REJECTED" => Ok(Resolution::Rejected),
            other => Err(format!("unknown approval status: {other}")),
        }
    }
}

/// A pending approval as shown to the operator.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalTicket {
    pub job_id: i64,
    pub generation: i64,
    pub context: Value,
    pub requested_at: DateTime<Utc>,
    /// Set when the operator has answered but the waiter has not picked it up yet.
    pub resolution: Option<Resolution>,
}

/// Backing store for approval tickets, one row per job.
///
/// Every ticket carries a generation. Opening a ticket bumps it and wipes any
/// resolution left over from an earlier ticket, so a waiter only ever sees
/// answers given to its own request.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Mark `job_id` pending and return the new generation.
    async fn open(&self, job_id: i64, context: &Value) -> Result<i64, PipelineError>;

    /// Consume the resolution of `generation` if one has been given.
    ///
    /// Clears the pending marker and the resolution in the same step. Returns
    /// `None` while unresolved or when the ticket has moved on.
    async fn take(&self, job_id: i64, generation: i64) -> Result<Option<Resolution>, PipelineError>;

    /// Record the operator's answer on the pending ticket.
    ///
    /// Fails with `NoPendingApproval` when nothing is pending. Answering twice
    /// before the waiter consumes it keeps the latest answer.
    async fn resolve(&self, job_id: i64, resolution: Resolution) -> Result<i64, PipelineError>;

    /// Drop the ticket if it is still at `generation`.
    async fn abandon(&self, job_id: i64, generation: i64) -> Result<(), PipelineError>;

    async fn pending(&self) -> Result<Vec<ApprovalTicket>, PipelineError>;

    /// Resolve once `job_id` may have changed, or after `poll` at the latest.
    async fn changed(&self, _job_id: i64, poll: Duration) {
        tokio::time::sleep(poll).await;
    }
}
