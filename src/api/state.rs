use std::sync::Arc;

use crate::analytics::AnalyticsSink;
use crate::approval::ApprovalGate;
use crate::db::Store;
use crate::queue::{ApplyQueue, RawJobQueue};

/// Collaborators shared by every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub raw_jobs: RawJobQueue,
    pub apply: ApplyQueue,
    pub gate: ApprovalGate,
    pub analytics: Arc<dyn AnalyticsSink>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        raw_jobs: RawJobQueue,
        apply: ApplyQueue,
        gate: ApprovalGate,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            store,
            raw_jobs,
            apply,
            gate,
            analytics,
        }
    }
}
