use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use tracing::error;

use crate::api::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    queues: Option<QueueState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct QueueState {
    raw_jobs: u64,
    apply: u64,
}

/// General health check including database connectivity.
/// Use for load balancers and uptime monitors.
#[get("/health")]
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "healthy",
            database: "connected",
            queues: None,
            error: None,
        }),
        Err(e) => {
            error!("Health check failed: {:?}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "unhealthy",
                database: "disconnected",
                queues: None,
                error: Some(format!("Database error: {}", e)),
            })
        }
    }
}

/// Ready once both the store and the stage queues answer.
///
/// Returns 503 while a dependency is down; the process recovers on its own
/// when it comes back.
#[get("/ready")]
async fn readiness_check(state: web::Data<AppState>) -> impl Responder {
    let ping = async {
        state.store.ping().await?;
        Ok::<_, crate::error::PipelineError>(QueueState {
            raw_jobs: state.raw_jobs.depth().await?,
            apply: state.apply.depth().await?,
        })
    };

    match ping.await {
        Ok(queues) => HttpResponse::Ok().json(HealthResponse {
            status: "ready",
            database: "connected",
            queues: Some(queues),
            error: None,
        }),
        Err(e) => {
            error!("Readiness check failed: {:?}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "not_ready",
                database: "disconnected",
                queues: None,
                error: Some(format!("Dependency unavailable: {}", e)),
            })
        }
    }
}

/// Liveness check: the process is up. Dependencies are not checked.
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "alive",
        database: "not_checked",
        queues: None,
        error: None,
    })
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}
