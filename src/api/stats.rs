use actix_web::{
    get,
    web::{Data, ServiceConfig},
    HttpResponse,
};
use serde::Serialize;

use crate::analytics::AnalyticsStats;
use crate::api::error::ServiceError;
use crate::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct QueueDepths {
    pub raw_jobs: u64,
    pub apply: u64,
}

/// Analytics counters plus what is currently in flight.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub events: AnalyticsStats,
    pub queues: QueueDepths,
    pub pending_approvals: usize,
}

pub async fn collect(state: &AppState) -> Result<StatsResponse, ServiceError> {
    Ok(StatsResponse {
        events: state.analytics.stats().await?,
        queues: QueueDepths {
            raw_jobs: state.raw_jobs.depth().await?,
            apply: state.apply.depth().await?,
        },
        pending_approvals: state.gate.pending().await?.len(),
    })
}

#[get("/stats")]
async fn stats(state: Data<AppState>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(collect(&state).await?))
}

pub fn stats_config(config: &mut ServiceConfig) {
    config.service(stats);
}
