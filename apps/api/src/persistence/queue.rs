use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::analytics::{self, AnalyticsEvent};
use crate::persistence::adapter::DocumentStoreAdapter;
use crate::persistence::status::SaveIndicator;
use crate::persistence::CvSnapshot;

#[derive(Debug)]
struct SaveRequest {
    owner: Option<String>,
    snapshot: CvSnapshot,
}

#[derive(Debug, Default)]
struct Pending {
    generation: u64,
    /// At most one request per owner, in the order their latest save was
    /// issued.
    requests: Vec<SaveRequest>,
}

impl Pending {
    fn push(&mut self, request: SaveRequest) -> u64 {
        self.requests.retain(|queued| queued.owner != request.owner);
        self.requests.push(request);
        self.generation += 1;
        self.generation
    }
}

/// Serializes saves through one worker.
///
/// At most one write is in flight. Requests arriving while a write runs are
/// coalesced per owner: only the most recent document of each owner is kept
/// and written next. Writes for one owner land in the order they were issued,
/// so an older document can never overwrite a newer one, and a save queued for
/// one user is never dropped in favour of another user's.
pub struct SaveQueue {
    pending: Arc<watch::Sender<Pending>>,
    completed: Arc<watch::Sender<u64>>,
    worker: JoinHandle<()>,
}

impl SaveQueue {
    pub fn spawn(adapter: Arc<DocumentStoreAdapter>, indicator: SaveIndicator) -> Self {
        let pending = Arc::new(watch::channel(Pending::default()).0);
        let completed = Arc::new(watch::channel(0u64).0);

        let queued = pending.clone();
        let mut pending_rx = pending.subscribe();
        let done = completed.clone();
        let worker = tokio::spawn(async move {
            while pending_rx.changed().await.is_ok() {
                let mut generation = 0;
                let mut batch = Vec::new();
                queued.send_if_modified(|pending| {
                    generation = pending.generation;
                    batch = std::mem::take(&mut pending.requests);
                    false
                });
                if batch.is_empty() {
                    continue;
                }

                for request in batch {
                    write(&adapter, &indicator, generation, request).await;
                }
                done.send_replace(generation);
            }
        });

        Self {
            pending,
            completed,
            worker,
        }
    }

    /// Queues `snapshot` for writing and returns its generation. Never waits
    /// on I/O.
    pub fn enqueue(&self, owner: Option<String>, snapshot: CvSnapshot) -> u64 {
        let mut generation = 0;
        self.pending.send_modify(|pending| {
            generation = pending.push(SaveRequest { owner, snapshot });
        });
        generation
    }

    /// Waits until `generation`, or a newer request that replaced it, has
    /// been written (or has failed).
    pub async fn flush(&self, generation: u64) {
        let mut completed = self.completed.subscribe();
        if completed.wait_for(|done| *done >= generation).await.is_err() {
            warn!("Save worker stopped before generation {generation} completed");
        }
    }
}

async fn write(
    adapter: &DocumentStoreAdapter,
    indicator: &SaveIndicator,
    generation: u64,
    request: SaveRequest,
) {
    let result = match &request.owner {
        Some(owner) => adapter.save(owner, &request.snapshot).await,
        None => adapter.save_local(&request.snapshot).await,
    };
    match result {
        Ok(outcome) => {
            debug!("Save generation {generation} completed: {outcome:?}");
            indicator.record(outcome);
        }
        Err(e) => {
            warn!("Save generation {generation} failed: {e}");
            analytics::track(AnalyticsEvent::Error {
                kind: "cv_save",
                message: &e.to_string(),
            });
            indicator.record_failure(&e);
        }
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::document::CvDocument;
    use crate::testing::{MemoryCache, MemoryDocumentStore, RemoteMode};
    use std::time::Duration;

    fn named(name: &str) -> CvSnapshot {
        let mut document = CvDocument::default();
        document.personal_info.full_name = name.to_string();
        CvSnapshot {
            document,
            selected_template: None,
        }
    }

    fn queue_over(remote: &Arc<MemoryDocumentStore>) -> (SaveQueue, SaveIndicator) {
        let adapter = Arc::new(DocumentStoreAdapter::new(
            remote.clone(),
            Arc::new(MemoryCache::default()),
        ));
        let indicator = SaveIndicator::new();
        (SaveQueue::spawn(adapter, indicator.clone()), indicator)
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_order_wins_even_when_first_write_is_slower() {
        let remote = Arc::new(MemoryDocumentStore::default());
        remote.delay_for("A", Duration::from_millis(50));
        remote.delay_for("B", Duration::from_millis(10));
        let (queue, _) = queue_over(&remote);

        queue.enqueue(Some("u1".into()), named("A"));
        let last = queue.enqueue(Some("u1".into()), named("B"));
        queue.flush(last).await;

        assert_eq!(remote.stored("u1"), Some(named("B")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced() {
        let remote = Arc::new(MemoryDocumentStore::default());
        remote.delay_for("v0", Duration::from_millis(100));
        let (queue, _) = queue_over(&remote);

        queue.enqueue(Some("u1".into()), named("v0"));
        // Let the worker pick up v0 before the burst arrives.
        tokio::time::sleep(Duration::from_millis(1)).await;
        let mut last = 0;
        for i in 1..=20 {
            last = queue.enqueue(Some("u1".into()), named(&format!("v{i}")));
        }
        queue.flush(last).await;

        assert_eq!(remote.stored("u1"), Some(named("v20")));
        assert_eq!(remote.put_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_save_survives_another_owners_save() {
        let remote = Arc::new(MemoryDocumentStore::default());
        remote.delay_for("slow", Duration::from_millis(100));
        let (queue, _) = queue_over(&remote);

        queue.enqueue(Some("u1".into()), named("slow"));
        tokio::time::sleep(Duration::from_millis(1)).await;
        queue.enqueue(Some("u1".into()), named("u1 final"));
        let last = queue.enqueue(Some("u2".into()), named("u2 draft"));
        queue.flush(last).await;

        assert_eq!(remote.stored("u1"), Some(named("u1 final")));
        assert_eq!(remote.stored("u2"), Some(named("u2 draft")));
    }

    #[tokio::test]
    async fn test_flush_updates_indicator() {
        let remote = Arc::new(MemoryDocumentStore::default());
        let (queue, indicator) = queue_over(&remote);

        let generation = queue.enqueue(Some("u1".into()), named("A"));
        queue.flush(generation).await;

        let status = indicator.status();
        assert!(status.just_saved);
        assert!(!status.offline);
    }

    #[tokio::test]
    async fn test_failed_save_still_completes_flush() {
        let remote = Arc::new(MemoryDocumentStore::default());
        remote.set_mode(RemoteMode::Rejecting);
        let (queue, indicator) = queue_over(&remote);

        let generation = queue.enqueue(Some("u1".into()), named("A"));
        queue.flush(generation).await;

        assert!(indicator.status().last_error.is_some());
    }

    #[tokio::test]
    async fn test_unowned_save_goes_to_cache_only() {
        let remote = Arc::new(MemoryDocumentStore::default());
        let (queue, indicator) = queue_over(&remote);

        let generation = queue.enqueue(None, named("Guest"));
        queue.flush(generation).await;

        assert_eq!(remote.put_count(), 0);
        assert!(indicator.status().just_saved);
    }
}
