use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex, Notify};

use crate::approval::store::{ApprovalStore, ApprovalTicket, Resolution};
use crate::error::PipelineError;

struct Slot {
    generation: i64,
    pending: bool,
    ticket: ApprovalTicket,
}

/// In-process approval store. Resolutions wake waiters without waiting for
/// the next poll.
#[derive(Default)]
pub struct MemoryApprovalStore {
    slots: Mutex<HashMap<i64, Slot>>,
    notify: Notify,
}

impl MemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn open(&self, job_id: i64, context: &Value) -> Result<i64, PipelineError> {
        let mut slots = self.slots.lock().await;
        let generation = slots.get(&job_id).map_or(1, |slot| slot.generation + 1);
        slots.insert(
            job_id,
            Slot {
                generation,
                pending: true,
                ticket: ApprovalTicket {
                    job_id,
                    generation,
                    context: context.clone(),
                    requested_at: Utc::now(),
                    resolution: None,
                },
            },
        );
        Ok(generation)
    }

    async fn take(&self, job_id: i64, generation: i64) -> Result<Option<Resolution>, PipelineError> {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(&job_id) else {
            return Ok(None);
        };
        if slot.generation != generation || !slot.pending {
            return Ok(None);
        }
        let taken = slot.ticket.resolution.take();
        if taken.is_some() {
            slot.pending = false;
        }
        Ok(taken)
    }

    async fn resolve(&self, job_id: i64, resolution: Resolution) -> Result<i64, PipelineError> {
        let generation = {
            let mut slots = self.slots.lock().await;
            let slot = slots
                .get_mut(&job_id)
                .filter(|slot| slot.pending)
                .ok_or(PipelineError::NoPendingApproval(job_id))?;
            slot.ticket.resolution = Some(resolution);
            slot.generation
        };
        self.notify.notify_waiters();
        Ok(generation)
    }

    async fn abandon(&self, job_id: i64, generation: i64) -> Result<(), PipelineError> {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(&job_id) {
            if slot.generation == generation {
                slot.pending = false;
                slot.ticket.resolution = None;
            }
        }
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<ApprovalTicket>, PipelineError> {
        let slots = self.slots.lock().await;
        let mut tickets: Vec<ApprovalTicket> = slots
            .values()
            .filter(|slot| slot.pending)
            .map(|slot| slot.ticket.clone())
            .collect();
        tickets.sort_by_key(|t| (t.requested_at, t.job_id));
        Ok(tickets)
    }

    async fn changed(&self, _job_id: i64, poll: Duration) {
        let _ = tokio::time::timeout(poll, self.notify.notified()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn resolve_without_pending_ticket_is_refused() {
        let store = MemoryApprovalStore::new();
        let err = store.resolve(3, Resolution::Approved).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoPendingApproval(3)));
    }

    #[tokio::test]
    async fn reopening_discards_stale_resolution() {
        let store = MemoryApprovalStore::new();
        let first = store.open(3, &json!({})).await.unwrap();
        store.resolve(3, Resolution::Approved).await.unwrap();

        let second = store.open(3, &json!({})).await.unwrap();
        assert_eq!(second, first + 1);
        assert_eq!(store.take(3, first).await.unwrap(), None);
        assert_eq!(store.take(3, second).await.unwrap(), None);
    }

    #[tokio::test]
    async fn take_consumes_once() {
        let store = MemoryApprovalStore::new();
        let generation = store.open(9, &json!({"title": "SRE"})).await.unwrap();
        assert_eq!(store.take(9, generation).await.unwrap(), None);

        store.resolve(9, Resolution::Rejected).await.unwrap();
        assert_eq!(store.take(9, generation).await.unwrap(), Some(Resolution::Rejected));
        assert_eq!(store.take(9, generation).await.unwrap(), None);
        assert!(store.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn abandon_only_touches_its_generation() {
        let store = MemoryApprovalStore::new();
        let old = store.open(5, &json!({})).await.unwrap();
        let current = store.open(5, &json!({})).await.unwrap();

        store.abandon(5, old).await.unwrap();
        assert_eq!(store.pending().await.unwrap().len(), 1);

        store.abandon(5, current).await.unwrap();
        assert!(store.pending().await.unwrap().is_empty());
    }
}
