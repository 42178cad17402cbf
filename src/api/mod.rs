//! HTTP surface: intake, operator actions and health checks.

pub mod applications;
pub mod approvals;
pub mod error;
pub mod health;
pub mod job;
pub mod state;
pub mod stats;
pub mod validation;

use actix_web::web::ServiceConfig;

pub use state::AppState;

/// Registers every route.
pub fn routes(config: &mut ServiceConfig) {
    config
        .configure(health::health_config)
        .configure(job::handlers::job_config)
        .configure(applications::applications_config)
        .configure(approvals::approvals_config)
        .configure(stats::stats_config);
}
