use thiserror::Error;

use crate::browser::DriverError;
use crate::domain::JobStatus;
use crate::oracle::OracleError;

/// Failure taxonomy shared by every pipeline stage.
///
/// Nothing in the pipeline retries on its own: a stage that sees one of
/// these gives up on the current item and leaves any retry to the operator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Navigation, network, browser or local file failure.
    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    /// The decision oracle errored or answered with something unusable.
    #[error("oracle failure: {0}")]
    Oracle(#[from] OracleError),

    /// Database failure. The item being processed is dropped.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: i64,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("job {platform}/{platform_job_id} already exists")]
    Duplicate {
        platform: String,
        platform_job_id: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no approval pending for job {0}")]
    NoPendingApproval(i64),
}

impl From<DriverError> for PipelineError {
    fn from(err: DriverError) -> Self {
        PipelineError::TransientIo(err.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::TransientIo(err.to_string())
    }
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        PipelineError::NotFound { entity, id }
    }
}
