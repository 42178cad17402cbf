use serde::Serialize;

use crate::domain::Job;

/// Response for a single accepted intake item
#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub message: String,
    pub queue_depth: u64,
}

/// Validation errors for one rejected item of a bulk request
#[derive(Debug, Serialize)]
pub struct ItemError {
    pub index: usize,
    pub platform_job_id: String,
    pub errors: Vec<String>,
}

/// Response for bulk intake
#[derive(Debug, Serialize)]
pub struct BulkEnqueueResponse {
    pub message: String,
    pub enqueued: usize,
    pub errors: Vec<ItemError>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub message: String,
    pub job: Job,
}
