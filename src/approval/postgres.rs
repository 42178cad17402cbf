use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, Pool, Postgres};
use tracing::warn;

use crate::approval::store::{ApprovalStore, ApprovalTicket, Resolution};
use crate::error::PipelineError;

/// Approval tickets kept in the `approvals` table.
///
/// Waiters rely on the default polling `changed`, which lets an operator in
/// another process resolve tickets with a plain UPDATE.
#[derive(Clone)]
pub struct PgApprovalStore {
    pool: Pool<Postgres>,
}

impl PgApprovalStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TicketRow {
    job_id: i64,
    generation: i64,
    status: Option<String>,
    context: Json<Value>,
    requested_at: DateTime<Utc>,
}

fn parse_status(job_id: i64, status: Option<String>) -> Option<Resolution> {
    let raw = status?;
    match raw.parse() {
        Ok(resolution) => Some(resolution),
        Err(e) => {
            warn!(job_id, "Ignoring approval status: {}", e);
            None
        }
    }
}

#[async_trait]
impl ApprovalStore for PgApprovalStore {
    async fn open(&self, job_id: i64, context: &Value) -> Result<i64, PipelineError> {
        let (generation,): (i64,) = sqlx::query_as(
            "INSERT INTO approvals (job_id, generation, pending, status, context, requested_at, resolved_at)
             VALUES ($1, 1, TRUE, NULL, $2, NOW(), NULL)
             ON CONFLICT (job_id) DO UPDATE SET
                 generation = approvals.generation + 1,
                 pending = TRUE,
                 status = NULL,
                 context = EXCLUDED.context,
                 requested_at = NOW(),
                 resolved_at = NULL
             RETURNING generation",
        )
        .bind(job_id)
        .bind(Json(context))
        .fetch_one(&self.pool)
        .await?;

        Ok(generation)
    }

    async fn take(&self, job_id: i64, generation: i64) -> Result<Option<Resolution>, PipelineError> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            "WITH cur AS (
                 SELECT job_id, status FROM approvals
                 WHERE job_id = $1 AND generation = $2 AND pending AND status IS NOT NULL
                 FOR UPDATE
             )
             UPDATE approvals a SET pending = FALSE, status = NULL
             FROM cur
             WHERE a.job_id = cur.job_id
             RETURNING cur.status",
        )
        .bind(job_id)
        .bind(generation)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(status,)| parse_status(job_id, status)))
    }

    async fn resolve(&self, job_id: i64, resolution: Resolution) -> Result<i64, PipelineError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE approvals SET status = $2, resolved_at = NOW()
             WHERE job_id = $1 AND pending
             RETURNING generation",
        )
        .bind(job_id)
        .bind(resolution.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(generation,)| generation)
            .ok_or(PipelineError::NoPendingApproval(job_id))
    }

    async fn abandon(&self, job_id: i64, generation: i64) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE approvals SET pending = FALSE, status = NULL
             WHERE job_id = $1 AND generation = $2",
        )
        .bind(job_id)
        .bind(generation)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<ApprovalTicket>, PipelineError> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT job_id, generation, status, context, requested_at
             FROM approvals WHERE pending ORDER BY requested_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ApprovalTicket {
                job_id: row.job_id,
                generation: row.generation,
                resolution: parse_status(row.job_id, row.status),
                context: row.context.0,
                requested_at: row.requested_at,
            })
            .collect())
    }
}
