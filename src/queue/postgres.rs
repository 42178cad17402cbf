use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::PipelineError;
use crate::queue::StageQueue;

/// Stage queue stored in the `stage_queue` table.
///
/// Pop is a single `DELETE ... FOR UPDATE SKIP LOCKED` statement, so two
/// consumers never receive the same row and neither blocks on the other.
pub struct PgStageQueue {
    pool: Pool<Postgres>,
    queue: String,
    poll_interval: Duration,
}

impl PgStageQueue {
    pub fn new(pool: Pool<Postgres>, queue: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            pool,
            queue: queue.into(),
            poll_interval,
        }
    }

    async fn try_pop(&self) -> Result<Option<Value>, PipelineError> {
        let row: Option<(Json<Value>,)> = sqlx::query_as(
            "DELETE FROM stage_queue
             WHERE id = (
                 SELECT id FROM stage_queue
                 WHERE queue = $1
                 ORDER BY id
                 FOR UPDATE SKIP LOCKED
                 LIMIT 1
             )
             RETURNING payload",
        )
        .bind(&self.queue)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(payload,)| payload.0))
    }
}

#[async_trait]
impl StageQueue for PgStageQueue {
    fn name(&self) -> &str {
        &self.queue
    }

    async fn enqueue(&self, item: Value) -> Result<(), PipelineError> {
        sqlx::query("INSERT INTO stage_queue (queue, payload) VALUES ($1, $2)")
            .bind(&self.queue)
            .bind(Json(&item))
            .execute(&self.pool)
            .await?;
        debug!(queue = %self.queue, "Enqueued item");
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<Value>, PipelineError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.try_pop().await? {
                return Ok(Some(item));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn len(&self) -> Result<u64, PipelineError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stage_queue WHERE queue = $1")
            .bind(&self.queue)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
