//! The upload queue: public surface over the store, scheduler, and validator.
//!
//! One `UploadQueue` per upload session; instances are independent (no
//! process-wide state) and cheaply cloneable, sharing the same underlying
//! queue. All operations are safe to call from any thread.

pub(crate) mod store;

use crate::config::UploadConfig;
use crate::events::UploadObservers;
use crate::item::{QueueItem, UploadStatus};
use crate::progress::{self, QueueStats};
use crate::scheduler::{self, RunHandle};
use crate::validate::{self, AddOutcome, Candidate};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use store::QueueInner;
use thiserror::Error;

/// API misuse and construction errors.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid upload URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("an upload run is already active")]
    AlreadyRunning,
    #[error("no pending uploads")]
    NothingToDo,
}

/// A concurrent, bounded upload queue targeting one endpoint.
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

impl UploadQueue {
    /// Build a queue for `config`, reporting through `observers`. Fails when
    /// the endpoint URL does not parse.
    pub fn new(config: UploadConfig, observers: UploadObservers) -> Result<Self, QueueError> {
        url::Url::parse(&config.upload_url)?;
        Ok(Self {
            inner: Arc::new(QueueInner::new(config, observers)),
        })
    }

    /// Validate `candidates` and enqueue the accepted ones as pending items.
    /// Rejected candidates are reported back by name and cause no side
    /// effects. Unreadable files are rejected rather than enqueued.
    pub fn add_files(&self, candidates: Vec<Candidate>) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        // Validation stats the filesystem; do all of it before taking the
        // state lock so a slow disk cannot stall in-flight workers.
        let mut accepted: Vec<(std::path::PathBuf, String, u64)> = Vec::new();
        for candidate in candidates {
            let name = candidate.file_name();
            if !validate::is_acceptable(&self.inner.config, &name, candidate.mime_type.as_deref()) {
                tracing::debug!(name = %name, "candidate rejected by allow-lists");
                outcome.rejected.push(name);
                continue;
            }
            match validate::payload_size(&candidate.path) {
                Ok(size) => accepted.push((candidate.path, name, size)),
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "candidate unreadable, rejecting");
                    outcome.rejected.push(name);
                }
            }
        }
        let snapshot = {
            let mut state = self.inner.state.lock().unwrap();
            for (path, name, size) in accepted {
                let id = state.next_id;
                state.next_id += 1;
                state.items.push(QueueItem::new(id, path, name, size));
                outcome.added += 1;
            }
            (outcome.added > 0).then(|| state.items.clone())
        };
        if let Some(snapshot) = snapshot {
            self.inner.notify_queue_update(&snapshot);
        }
        outcome
    }

    /// Snapshot of all items in display (insertion) order.
    pub fn items(&self) -> Vec<QueueItem> {
        self.inner.snapshot()
    }

    pub fn stats(&self) -> QueueStats {
        progress::queue_stats(&self.inner.snapshot())
    }

    /// Rounded mean progress over all items; 0 for an empty queue.
    pub fn overall_progress(&self) -> u8 {
        progress::overall_progress(&self.inner.snapshot())
    }

    /// True while a run is active.
    pub fn is_uploading(&self) -> bool {
        self.inner.run.active.load(Ordering::SeqCst)
    }

    /// Remove the item with `id`. An in-flight transfer is aborted first so
    /// no orphaned operation keeps referencing the removed item.
    pub fn remove_item(&self, id: u64) -> bool {
        let snapshot = {
            let mut state = self.inner.state.lock().unwrap();
            let Some(idx) = state.items.iter().position(|i| i.id == id) else {
                return false;
            };
            if let Some(handle) = state.items[idx].cancel.take() {
                handle.request();
            }
            state.items.remove(idx);
            state.skip.insert(id);
            state.items.clone()
        };
        self.inner.notify_queue_update(&snapshot);
        true
    }

    /// Remove the item at `index` in display order.
    pub fn remove_at(&self, index: usize) -> bool {
        let id = {
            let state = self.inner.state.lock().unwrap();
            match state.items.get(index) {
                Some(item) => item.id,
                None => return false,
            }
        };
        self.remove_item(id)
    }

    /// Abort every in-flight transfer, drop all items, and reset scheduler
    /// bookkeeping (active flag, cancellation flag, per-run exclusions).
    pub fn clear(&self) {
        // Supersede the active run so late workers cannot claim or summarize.
        self.inner.run.run_id.fetch_add(1, Ordering::SeqCst);
        let snapshot = {
            let mut state = self.inner.state.lock().unwrap();
            for item in &mut state.items {
                if let Some(handle) = item.cancel.take() {
                    handle.request();
                }
            }
            state.items.clear();
            state.skip.clear();
            state.items.clone()
        };
        self.inner.run.active.store(false, Ordering::SeqCst);
        self.inner.run.cancelled.store(false, Ordering::SeqCst);
        self.inner.notify_queue_update(&snapshot);
    }

    /// Cancel one in-flight item: abort its transfer and roll it back to
    /// pending with zeroed progress. It will not be re-claimed until the
    /// next run. No-op when the item is not uploading.
    pub fn cancel_item(&self, id: u64) {
        self.inner.rollback_uploading(Some(id));
    }

    /// Cancel the whole run: stop further claims, abort every in-flight
    /// transfer, roll each back to pending, and mark the run inactive.
    /// Idempotent; a no-op when nothing is in flight.
    pub fn cancel_all(&self) {
        self.inner.run.cancelled.store(true, Ordering::SeqCst);
        let changed = self.inner.rollback_uploading(None);
        self.inner.run.active.store(false, Ordering::SeqCst);
        if changed > 0 {
            tracing::info!(rolled_back = changed, "cancelled all in-flight uploads");
        }
    }

    /// Drive all pending items to a terminal state under the concurrency
    /// bound. Reports through the observers; the returned handle can be
    /// joined for the summary (`None` when the run is cancelled).
    pub fn start_upload(&self) -> Result<RunHandle, QueueError> {
        if self.inner.run.active.swap(true, Ordering::SeqCst) {
            return Err(QueueError::AlreadyRunning);
        }
        let pending = {
            let mut state = self.inner.state.lock().unwrap();
            state.skip.clear();
            state
                .items
                .iter()
                .filter(|i| i.status == UploadStatus::Pending)
                .count()
        };
        if pending == 0 {
            self.inner.run.active.store(false, Ordering::SeqCst);
            return Err(QueueError::NothingToDo);
        }
        self.inner.run.cancelled.store(false, Ordering::SeqCst);
        let run_id = self.inner.run.run_id.fetch_add(1, Ordering::SeqCst) + 1;
        let workers = self.inner.config.effective_concurrency().min(pending);
        tracing::info!(pending, workers, "starting upload run");
        Ok(RunHandle::new(scheduler::spawn_run(
            Arc::clone(&self.inner),
            run_id,
            workers,
        )))
    }

    /// Roll every failed item back to pending (clearing its error and
    /// progress), leave successes untouched, then start a run.
    pub fn retry_failed(&self) -> Result<RunHandle, QueueError> {
        let reset = self.reset_failed_items();
        if reset > 0 {
            tracing::info!(reset, "retrying failed uploads");
        }
        self.start_upload()
    }

    fn reset_failed_items(&self) -> usize {
        let (reset, snapshot) = {
            let mut state = self.inner.state.lock().unwrap();
            let mut reset = 0;
            for item in &mut state.items {
                if item.status == UploadStatus::Error {
                    item.status = UploadStatus::Pending;
                    item.progress = 0;
                    item.error_message = None;
                    reset += 1;
                }
            }
            (reset, state.items.clone())
        };
        if reset > 0 {
            self.inner.notify_queue_update(&snapshot);
        }
        reset
    }
}
