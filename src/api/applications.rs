use actix_web::{
    get, post,
    web::{Data, Path, Query, ServiceConfig, scope},
    HttpResponse,
};
use serde_json::json;
use tracing::info;

use crate::api::error::ServiceError;
use crate::api::state::AppState;
use crate::db::Pagination;
use crate::domain::{Application, ApplicationLogEntry};
use crate::error::PipelineError;

/// Put an unsubmitted application back on the apply queue. Used for
/// applications whose first push failed or whose approval wait was cut
/// short by shutdown.
pub async fn requeue(state: &AppState, application_id: i64) -> Result<Application, PipelineError> {
    let application = state.store.get_application(application_id).await?;
    if application.is_submitted() {
        return Err(PipelineError::InvalidInput(format!(
            "application {application_id} was already submitted"
        )));
    }
    state.apply.push(application_id).await?;
    state
        .store
        .append_application_logs(application_id, &[ApplicationLogEntry::new("requeued", json!({}))])
        .await?;
    info!(application_id, job_id = application.job_id, "Application requeued");
    Ok(application)
}

#[get("")]
async fn list_applications(
    state: Data<AppState>,
    page: Query<Pagination>,
) -> Result<HttpResponse, ServiceError> {
    if page.limit <= 0 || page.skip < 0 {
        return Err(ServiceError::ValidationError(
            "limit must be positive and skip non-negative".to_string(),
        ));
    }
    let applications = state.store.list_applications(page.into_inner()).await?;
    Ok(HttpResponse::Ok().json(applications))
}

#[post("/{id}/requeue")]
async fn requeue_application(
    state: Data<AppState>,
    id: Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let application = requeue(&state, id.into_inner()).await?;
    Ok(HttpResponse::Accepted().json(json!({
        "message": "Application requeued",
        "application_id": application.id,
    })))
}

pub fn applications_config(config: &mut ServiceConfig) {
    config.service(
        scope("applications")
            .service(list_applications)
            .service(requeue_application),
    );
}
