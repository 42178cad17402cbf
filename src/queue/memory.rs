use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};

use crate::error::PipelineError;
use crate::queue::StageQueue;

/// In-process stage queue for tests.
pub struct MemoryStageQueue {
    name: String,
    items: Mutex<VecDeque<Value>>,
    available: Notify,
}

impl MemoryStageQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    fn try_pop(&self) -> Option<Value> {
        self.items.lock().ok()?.pop_front()
    }
}

#[async_trait]
impl StageQueue for MemoryStageQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enqueue(&self, item: Value) -> Result<(), PipelineError> {
        self.items
            .lock()
            .map_err(|e| PipelineError::TransientIo(e.to_string()))?
            .push_back(item);
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<Value>, PipelineError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.try_pop() {
                return Ok(Some(item));
            }
            if timeout_at(deadline, self.available.notified()).await.is_err() {
                return Ok(self.try_pop());
            }
        }
    }

    async fn len(&self) -> Result<u64, PipelineError> {
        let items = self
            .items
            .lock()
            .map_err(|e| PipelineError::TransientIo(e.to_string()))?;
        Ok(items.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let queue = MemoryStageQueue::new("raw_jobs");
        for name in ["A", "B", "C"] {
            queue.enqueue(json!(name)).await.unwrap();
        }

        let mut seen = Vec::new();
        while let Some(item) = queue.dequeue(Duration::from_millis(10)).await.unwrap() {
            seen.push(item);
        }
        assert_eq!(seen, vec![json!("A"), json!("B"), json!("C")]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_queue_times_out() {
        let queue = MemoryStageQueue::new("apply");
        let started = Instant::now();
        let item = queue.dequeue(Duration::from_secs(5)).await.unwrap();
        assert!(item.is_none());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn waiting_consumer_wakes_on_enqueue() {
        let queue = Arc::new(MemoryStageQueue::new("apply"));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(json!(7)).await.unwrap();

        let got = consumer.await.unwrap().unwrap();
        assert_eq!(got, Some(json!(7)));
    }

    #[tokio::test]
    async fn each_item_goes_to_exactly_one_consumer() {
        let queue = Arc::new(MemoryStageQueue::new("apply"));
        for i in 0..50 {
            queue.enqueue(json!(i)).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Some(item) = queue.dequeue(Duration::from_millis(10)).await.unwrap() {
                    got.push(item.as_i64().unwrap());
                }
                got
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<i64>>());
    }
}
