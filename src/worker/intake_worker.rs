use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::queue::RawJobQueue;
use crate::workflow::{IntakeOutcome, IntakePipeline};

/// Background worker draining the raw-jobs queue into the fit workflow
pub struct IntakeWorker {
    queue: RawJobQueue,
    pipeline: Arc<IntakePipeline>,
    dequeue_timeout: Duration,
}

impl IntakeWorker {
    pub fn new(queue: RawJobQueue, pipeline: Arc<IntakePipeline>, dequeue_timeout: Duration) -> Self {
        Self {
            queue,
            pipeline,
            dequeue_timeout,
        }
    }

    /// Pop and process items one at a time until shutdown is signalled.
    ///
    /// A permit from the intake `semaphore` is taken before popping and held
    /// while the item is processed, so nothing leaves the queue until there
    /// is capacity for it. The shutdown flag is checked between items, so the
    /// item in hand always finishes.
    pub async fn run(&self, worker_id: u32, semaphore: Arc<Semaphore>, shutdown_rx: watch::Receiver<bool>) {
        info!("Intake worker {} started", worker_id);

        while !*shutdown_rx.borrow() {
            if let Err(e) = self.tick(worker_id, &semaphore).await {
                error!("Intake worker {} encountered queue error: {:?}", worker_id, e);
                sleep(Duration::from_secs(1)).await;
            }
        }

        info!("Intake worker {} stopped", worker_id);
    }

    /// Handle at most one item. Returns `false` when the queue stayed empty.
    ///
    /// Only queue errors are returned. A failure while processing an item is
    /// logged and the item is dropped.
    pub async fn tick(&self, worker_id: u32, semaphore: &Arc<Semaphore>) -> Result<bool, PipelineError> {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Intake worker {} failed to acquire semaphore: {:?}", worker_id, e);
                return Ok(false);
            }
        };

        let Some(item) = self.queue.pop(self.dequeue_timeout).await? else {
            return Ok(false);
        };

        let key = format!("{}:{}", item.platform, item.platform_job_id);
        match self.pipeline.process(item).await {
            Ok(IntakeOutcome::Tailored { job_id, application_id }) => {
                info!(worker_id, job_id, application_id, "Intake item tailored")
            }
            Ok(IntakeOutcome::Rejected { job_id }) => info!(worker_id, job_id, "Intake item rejected"),
            Err(PipelineError::Duplicate { .. }) => {
                warn!(worker_id, %key, "Posting already known, dropping")
            }
            Err(e) => error!(worker_id, %key, "Intake item dropped: {}", e),
        }

        drop(permit);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analytics::memory::MemoryAnalytics;
    use crate::artifacts::ArtifactWriter;
    use crate::db::memory::MemoryStore;
    use crate::db::Store;
    use crate::domain::profile::sample_profile;
    use crate::domain::{IntakeItem, JobStatus};
    use crate::queue::memory::MemoryStageQueue;
    use crate::queue::{ApplyQueue, APPLY, RAW_JOBS};
    use crate::testing::ScriptedOracle;
    use crate::workflow::FitWorkflow;

    struct Harness {
        worker: IntakeWorker,
        raw: RawJobQueue,
        apply: ApplyQueue,
        store: Arc<MemoryStore>,
        _dir: tempfile::TempDir,
    }

    fn harness(oracle: ScriptedOracle) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let raw = RawJobQueue::new(Arc::new(MemoryStageQueue::new(RAW_JOBS)));
        let apply = ApplyQueue::new(Arc::new(MemoryStageQueue::new(APPLY)));
        let pipeline = IntakePipeline::new(
            store.clone(),
            FitWorkflow::new(Arc::new(oracle), 60),
            ArtifactWriter::new(dir.path()),
            apply.clone(),
            Arc::new(MemoryAnalytics::new()),
            Arc::new(sample_profile()),
        );
        Harness {
            worker: IntakeWorker::new(raw.clone(), Arc::new(pipeline), Duration::from_millis(20)),
            raw,
            apply,
            store,
            _dir: dir,
        }
    }

    fn item(id: &str) -> IntakeItem {
        IntakeItem {
            platform: "indeed".into(),
            platform_job_id: id.into(),
            title: "Platform Engineer".into(),
            company: "Globex".into(),
            url: format!("https://jobs.example.com/{id}"),
            description: Some("Rust services on Kubernetes".into()),
            requires_sponsorship: false,
        }
    }

    #[tokio::test]
    async fn empty_queue_reports_idle() {
        let h = harness(ScriptedOracle::with_score(85));
        let semaphore = Arc::new(Semaphore::new(1));
        assert!(!h.worker.tick(1, &semaphore).await.unwrap());
    }

    #[tokio::test]
    async fn processes_queued_item_and_feeds_apply_queue() {
        let h = harness(ScriptedOracle::with_score(85));
        h.raw.push(&item("7")).await.unwrap();
        let semaphore = Arc::new(Semaphore::new(1));

        assert!(h.worker.tick(1, &semaphore).await.unwrap());

        let jobs = h.store.list_jobs(&Default::default()).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Tailored);
        assert_eq!(h.apply.depth().await.unwrap(), 1);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn failed_item_is_dropped_not_requeued() {
        let h = harness(ScriptedOracle::new());
        h.raw.push(&item("8")).await.unwrap();
        let semaphore = Arc::new(Semaphore::new(1));

        assert!(h.worker.tick(1, &semaphore).await.unwrap());
        assert_eq!(h.raw.depth().await.unwrap(), 0);
        assert_eq!(h.apply.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn item_stays_queued_while_no_permit_is_free() {
        let h = harness(ScriptedOracle::with_score(85));
        h.raw.push(&item("10")).await.unwrap();
        let semaphore = Arc::new(Semaphore::new(1));
        let held = semaphore.clone().acquire_owned().await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(50), h.worker.tick(1, &semaphore)).await;
        assert!(waited.is_err());
        assert_eq!(h.raw.depth().await.unwrap(), 1);

        drop(held);
        assert!(h.worker.tick(1, &semaphore).await.unwrap());
        assert_eq!(h.raw.depth().await.unwrap(), 0);
        assert_eq!(h.apply.depth().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let h = harness(ScriptedOracle::with_score(40));
        h.raw.push(&item("9")).await.unwrap();
        let (tx, rx) = watch::channel(false);
        let store = h.store.clone();

        let worker = h.worker;
        let handle = tokio::spawn(async move {
            worker.run(1, Arc::new(Semaphore::new(1)), rx).await;
        });

        for _ in 0..100 {
            if !store.list_jobs(&Default::default()).await.unwrap().is_empty() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();

        let jobs = store.list_jobs(&Default::default()).await.unwrap();
        assert_eq!(jobs[0].status, JobStatus::Rejected);
    }
}
