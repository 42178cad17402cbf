use actix_web::{
    get, post,
    web::{Data, Path, ServiceConfig, scope},
    HttpResponse,
};
use serde::Serialize;

use crate::api::error::ServiceError;
use crate::api::state::AppState;

#[derive(Debug, Serialize)]
struct ResolutionResponse {
    job_id: i64,
    status: &'static str,
}

/// Tickets still waiting for an operator, oldest first
#[get("")]
async fn list_pending(state: Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let tickets = state.gate.pending().await?;
    Ok(HttpResponse::Ok().json(tickets))
}

/// 409 when no approval is pending for the job.
#[post("/{job_id}/approve")]
async fn approve(state: Data<AppState>, job_id: Path<i64>) -> Result<HttpResponse, ServiceError> {
    let job_id = job_id.into_inner();
    state.gate.approve(job_id).await?;
    Ok(HttpResponse::Ok().json(ResolutionResponse {
        job_id,
        status: "APPROVED",
    }))
}

#[post("/{job_id}/reject")]
async fn reject(state: Data<AppState>, job_id: Path<i64>) -> Result<HttpResponse, ServiceError> {
    let job_id = job_id.into_inner();
    state.gate.reject(job_id).await?;
    Ok(HttpResponse::Ok().json(ResolutionResponse {
        job_id,
        status: "REJECTED",
    }))
}

pub fn approvals_config(config: &mut ServiceConfig) {
    config.service(
        scope("approvals")
            .service(list_pending)
            .service(approve)
            .service(reject),
    );
}
