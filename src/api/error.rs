use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::api::validation::ErrorResponse;
use crate::error::PipelineError;

/// Errors surfaced by the HTTP layer
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Request body was well-formed JSON but semantically invalid
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl ServiceError {
    fn title(&self) -> &'static str {
        match self {
            ServiceError::ValidationError(_) => "Validation failed",
            ServiceError::Pipeline(e) => match e {
                PipelineError::Persistence(_) => "Failed to process request",
                PipelineError::TransientIo(_) => "Dependency unavailable",
                PipelineError::Oracle(_) => "Oracle failure",
                PipelineError::NotFound { .. } => "Not found",
                PipelineError::InvalidInput(_) => "Validation failed",
                PipelineError::InvalidTransition { .. }
                | PipelineError::Duplicate { .. }
                | PipelineError::NoPendingApproval(_) => "Conflict",
            },
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::Pipeline(e) => match e {
                PipelineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                PipelineError::TransientIo(_) => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::Oracle(_) => StatusCode::BAD_GATEWAY,
                PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
                PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                PipelineError::InvalidTransition { .. }
                | PipelineError::Duplicate { .. }
                | PipelineError::NoPendingApproval(_) => StatusCode::CONFLICT,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Database details stay in the logs.
        let message = match self {
            ServiceError::Pipeline(PipelineError::Persistence(e)) => {
                error!("Database error: {}", e);
                "Database error occurred".to_string()
            }
            other if status.is_server_error() => {
                error!("Request failed: {}", other);
                other.to_string()
            }
            other => {
                warn!("Request refused: {}", other);
                other.to_string()
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.title().to_string(),
            fields: json!({"message": message}),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobStatus;

    #[test]
    fn domain_refusals_map_to_client_errors() {
        let not_found: ServiceError = PipelineError::not_found("job", 3).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let conflict: ServiceError = PipelineError::InvalidTransition {
            job_id: 3,
            from: JobStatus::Rejected,
            to: JobStatus::Interview,
        }
        .into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let pending: ServiceError = PipelineError::NoPendingApproval(3).into();
        assert_eq!(pending.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn database_errors_hide_details() {
        let err: ServiceError = PipelineError::Persistence(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.title(), "Failed to process request");
    }
}
