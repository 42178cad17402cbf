use std::sync::Arc;

use tokio::sync::Semaphore;

pub mod apply_worker;
pub mod intake_worker;

pub use apply_worker::ApplyWorker;
pub use intake_worker::IntakeWorker;

/// One semaphore per stage, each with `per_stage` permits.
#[derive(Clone)]
pub struct StagePermits {
    pub intake: Arc<Semaphore>,
    pub apply: Arc<Semaphore>,
}

impl StagePermits {
    pub fn new(per_stage: usize) -> Self {
        Self {
            intake: Arc::new(Semaphore::new(per_stage)),
            apply: Arc::new(Semaphore::new(per_stage)),
        }
    }
}
