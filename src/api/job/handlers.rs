use actix_web::{
    get, post,
    web::{Data, Path, Query, ServiceConfig, scope},
    HttpResponse,
};
use actix_web_validator::Json;

use super::service::JobService;
use crate::api::error::ServiceError;
use crate::domain::{IntakeItem, JobFilter};

#[post("")]
async fn enqueue_job(
    service: Data<JobService>,
    item: Json<IntakeItem>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.enqueue(&item).await?;
    Ok(HttpResponse::Accepted().json(response))
}

/// Bulk items are validated one by one, so the body is taken as plain JSON.
#[post("/bulk")]
async fn enqueue_bulk(
    service: Data<JobService>,
    items: actix_web::web::Json<Vec<IntakeItem>>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.bulk_enqueue(items.into_inner()).await?;
    Ok(HttpResponse::Accepted().json(response))
}

#[get("")]
async fn list_jobs(
    service: Data<JobService>,
    filter: Query<JobFilter>,
) -> Result<HttpResponse, ServiceError> {
    let jobs = service.list(&filter).await?;
    Ok(HttpResponse::Ok().json(jobs))
}

#[get("/{id}")]
async fn get_job(service: Data<JobService>, id: Path<i64>) -> Result<HttpResponse, ServiceError> {
    let job = service.get(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(job))
}

#[post("/{id}/interview")]
async fn mark_interview(
    service: Data<JobService>,
    id: Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.mark_interview(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub fn job_config(config: &mut ServiceConfig) {
    // `/bulk` must be registered ahead of `/{id}`.
    config.service(
        scope("jobs")
            .service(enqueue_job)
            .service(enqueue_bulk)
            .service(list_jobs)
            .service(get_job)
            .service(mark_interview),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use crate::api::state::test_state::memory_state;
    use crate::api::validation;
    use crate::db::Store;
    use crate::domain::{JobStatus, NewJob};

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new(JobService::new(
                        $state.store.clone(),
                        $state.raw_jobs.clone(),
                    )))
                    .app_data(validation::json_config())
                    .app_data(validation::query_config())
                    .configure(job_config),
            )
            .await
        };
    }

    fn posting() -> Value {
        json!({
            "platform": "linkedin",
            "platform_job_id": "3901",
            "title": "Backend Engineer",
            "company": "Acme",
            "url": "https://jobs.example.com/3901"
        })
    }

    #[actix_web::test]
    async fn valid_posting_is_accepted_and_queued() {
        let (state, _, _) = memory_state();
        let app = app!(state);

        let req = test::TestRequest::post().uri("/jobs").set_json(posting()).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(state.raw_jobs.depth().await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn invalid_posting_is_rejected_with_field_errors() {
        let (state, _, _) = memory_state();
        let app = app!(state);
        let mut body = posting();
        body["url"] = json!("not-a-url");

        let req = test::TestRequest::post().uri("/jobs").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Validation failed");
        assert!(body["fields"]["url"]["errors"].is_array());
        assert_eq!(state.raw_jobs.depth().await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn bulk_route_is_not_captured_by_id() {
        let (state, _, _) = memory_state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/jobs/bulk")
            .set_json(json!([posting(), {"platform": "", "platform_job_id": "x", "title": "t", "company": "c", "url": "https://a.example"}]))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["enqueued"], 1);
        assert_eq!(body["errors"][0]["index"], 1);
    }

    #[actix_web::test]
    async fn missing_job_is_404_and_status_filter_applies() {
        let (state, store, _) = memory_state();
        let app = app!(state);
        let job = store
            .create_job(&NewJob {
                platform: "linkedin".into(),
                platform_job_id: "1".into(),
                title: "Engineer".into(),
                company: "Acme".into(),
                url: "https://jobs.example.com/1".into(),
                description: "Rust".into(),
                requires_sponsorship: false,
            })
            .await
            .unwrap();
        store.advance_status(job.id, JobStatus::Rejected).await.unwrap();

        let resp = test::call_service(&app, test::TestRequest::get().uri("/jobs/404").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/jobs?status=REJECTED").to_request();
        let jobs: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(jobs.len(), 1);

        let req = test::TestRequest::get().uri("/jobs?status=rejected").to_request();
        let jobs: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(jobs.len(), 1);

        let req = test::TestRequest::get().uri("/jobs?status=TAILORED").to_request();
        let jobs: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert!(jobs.is_empty());

        let req = test::TestRequest::get().uri("/jobs?status=ARCHIVED").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post().uri(&format!("/jobs/{}/interview", job.id)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
