//! FIFO hand-off between pipeline stages.
//!
//! Delivery is at-most-once: `dequeue` removes the item, and nothing puts it
//! back if the consumer dies while processing it.

pub mod postgres;
#[cfg(test)]
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::domain::IntakeItem;
use crate::error::PipelineError;

pub use postgres::PgStageQueue;

/// Queue of raw postings waiting for evaluation.
pub const RAW_JOBS: &str = "raw_jobs";
/// Queue of application ids waiting for submission.
pub const APPLY: &str = "apply";

#[async_trait]
pub trait StageQueue: Send + Sync {
    fn name(&self) -> &str;

    async fn enqueue(&self, item: Value) -> Result<(), PipelineError>;

    /// Pop the oldest item, or `None` once `timeout` passes with the queue empty.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<Value>, PipelineError>;

    async fn len(&self) -> Result<u64, PipelineError>;
}

/// Typed view over the intake queue.
#[derive(Clone)]
pub struct RawJobQueue {
    inner: Arc<dyn StageQueue>,
}

impl RawJobQueue {
    pub fn new(inner: Arc<dyn StageQueue>) -> Self {
        Self { inner }
    }

    pub async fn push(&self, item: &IntakeItem) -> Result<(), PipelineError> {
        let payload = serde_json::to_value(item)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
        self.inner.enqueue(payload).await
    }

    /// Malformed payloads are logged and dropped.
    pub async fn pop(&self, timeout: Duration) -> Result<Option<IntakeItem>, PipelineError> {
        let Some(payload) = self.inner.dequeue(timeout).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<IntakeItem>(payload.clone()) {
            Ok(item) => Ok(Some(item)),
            Err(e) => {
                warn!(queue = self.inner.name(), %payload, "Dropping malformed intake item: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn depth(&self) -> Result<u64, PipelineError> {
        self.inner.len().await
    }
}

/// Typed view over the apply queue.
#[derive(Clone)]
pub struct ApplyQueue {
    inner: Arc<dyn StageQueue>,
}

impl ApplyQueue {
    pub fn new(inner: Arc<dyn StageQueue>) -> Self {
        Self { inner }
    }

    pub async fn push(&self, application_id: i64) -> Result<(), PipelineError> {
        self.inner.enqueue(Value::from(application_id)).await
    }

    pub async fn pop(&self, timeout: Duration) -> Result<Option<i64>, PipelineError> {
        let Some(payload) = self.inner.dequeue(timeout).await? else {
            return Ok(None);
        };
        match payload.as_i64() {
            Some(id) => Ok(Some(id)),
            None => {
                warn!(queue = self.inner.name(), %payload, "Dropping malformed application id");
                Ok(None)
            }
        }
    }

    pub async fn depth(&self) -> Result<u64, PipelineError> {
        self.inner.len().await
    }
}
