//! Shared queue state and the claim/finish transitions.
//!
//! One `Mutex<QueueState>` is the single source of truth; workers claim and
//! finish items through it. Observer callbacks are always invoked after the
//! lock is released, with snapshots cloned under the lock.

use crate::config::UploadConfig;
use crate::events::UploadObservers;
use crate::item::{CancelHandle, QueueItem, UploadStatus};
use crate::progress;
use crate::scheduler::FileOutcome;
use crate::transport::UploadOutcome;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Mutex;

pub(crate) struct QueueState {
    pub(crate) items: Vec<QueueItem>,
    pub(crate) next_id: u64,
    /// Items cancelled during the active run; excluded from further claims
    /// until the next `start_upload`.
    pub(crate) skip: HashSet<u64>,
}

/// Run bookkeeping. `run_id` is a generation counter so workers of a
/// cancelled or cleared run can never claim into a newly started one.
pub(crate) struct RunFlags {
    pub(crate) active: AtomicBool,
    pub(crate) cancelled: AtomicBool,
    pub(crate) run_id: AtomicU64,
}

pub(crate) struct QueueInner {
    pub(crate) config: UploadConfig,
    pub(crate) observers: UploadObservers,
    pub(crate) state: Mutex<QueueState>,
    pub(crate) run: RunFlags,
}

/// A claimed item, handed to the transport by a worker.
pub(crate) struct ClaimedUpload {
    pub(crate) id: u64,
    pub(crate) path: PathBuf,
    pub(crate) name: String,
    pub(crate) handle: CancelHandle,
}

impl QueueInner {
    pub(crate) fn new(config: UploadConfig, observers: UploadObservers) -> Self {
        Self {
            config,
            observers,
            state: Mutex::new(QueueState {
                items: Vec::new(),
                next_id: 1,
                skip: HashSet::new(),
            }),
            run: RunFlags {
                active: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                run_id: AtomicU64::new(0),
            },
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<QueueItem> {
        self.state.lock().unwrap().items.clone()
    }

    pub(crate) fn notify_queue_update(&self, snapshot: &[QueueItem]) {
        if let Some(cb) = &self.observers.on_queue_update {
            cb(snapshot);
        }
    }

    /// Claim the earliest pending item not excluded from this run: mark it
    /// uploading with a fresh cancel handle. Atomic with respect to other
    /// workers via the state mutex. `run_id` is re-verified under the lock
    /// so a worker of a superseded run can never claim into a newer one.
    pub(crate) fn claim_next(&self, run_id: u64) -> Option<ClaimedUpload> {
        let (claim, snapshot) = {
            let mut state = self.state.lock().unwrap();
            if self.run.cancelled.load(std::sync::atomic::Ordering::SeqCst)
                || self.run.run_id.load(std::sync::atomic::Ordering::SeqCst) != run_id
            {
                return None;
            }
            let skip = &state.skip;
            let idx = state
                .items
                .iter()
                .position(|i| i.status == UploadStatus::Pending && !skip.contains(&i.id))?;
            let handle = CancelHandle::new();
            let item = &mut state.items[idx];
            item.status = UploadStatus::Uploading;
            item.progress = 0;
            item.error_message = None;
            item.cancel = Some(handle.clone());
            let claim = ClaimedUpload {
                id: item.id,
                path: item.path.clone(),
                name: item.name.clone(),
                handle,
            };
            (claim, state.items.clone())
        };
        self.notify_queue_update(&snapshot);
        Some(claim)
    }

    /// Record transfer progress for a claimed item and fire the progress
    /// callback. Ignored when the claim went stale (cancelled or removed).
    pub(crate) fn update_progress(&self, id: u64, handle: &CancelHandle, percent: u8) {
        let (item, overall) = {
            let mut state = self.state.lock().unwrap();
            let Some(item) = state.items.iter_mut().find(|i| i.id == id) else {
                return;
            };
            if item.status != UploadStatus::Uploading || !claim_still_held(item, handle) {
                return;
            }
            item.progress = percent;
            let item = item.clone();
            let overall = progress::overall_progress(&state.items);
            (item, overall)
        };
        if let Some(cb) = &self.observers.on_progress {
            cb(&item, percent, overall);
        }
    }

    /// Apply a transfer outcome. Returns the settled record for the run
    /// summary (`None` for cancellation or a stale claim). Fires the
    /// queue-update callback and, for terminal outcomes, the per-file one.
    pub(crate) fn finish_item(
        &self,
        id: u64,
        handle: &CancelHandle,
        outcome: UploadOutcome,
    ) -> Option<FileOutcome> {
        let (item, snapshot) = {
            let mut state = self.state.lock().unwrap();
            let idx = state.items.iter().position(|i| i.id == id)?;
            if !claim_still_held(&state.items[idx], handle) {
                return None;
            }
            {
                let item = &mut state.items[idx];
                match &outcome {
                    UploadOutcome::Success(value) => {
                        item.status = UploadStatus::Success;
                        item.progress = 100;
                        item.error_message = None;
                        item.result = Some(value.clone());
                    }
                    UploadOutcome::Failure(message) => {
                        item.status = UploadStatus::Error;
                        item.progress = 100;
                        item.error_message = Some(message.clone());
                        item.result = None;
                    }
                    UploadOutcome::Cancelled => {
                        item.status = UploadStatus::Pending;
                        item.progress = 0;
                        item.error_message = None;
                        item.result = None;
                    }
                }
                item.cancel = None;
            }
            if matches!(outcome, UploadOutcome::Cancelled) {
                state.skip.insert(id);
            }
            (state.items[idx].clone(), state.items.clone())
        };

        self.notify_queue_update(&snapshot);

        match &outcome {
            UploadOutcome::Success(value) => {
                tracing::debug!(id, name = %item.name, "upload succeeded");
                if let Some(cb) = &self.observers.on_file_complete {
                    cb(&item, Ok(value));
                }
            }
            UploadOutcome::Failure(message) => {
                tracing::debug!(id, name = %item.name, error = %message, "upload failed");
                if let Some(cb) = &self.observers.on_file_complete {
                    cb(&item, Err(message.as_str()));
                }
            }
            UploadOutcome::Cancelled => {
                tracing::debug!(id, name = %item.name, "upload cancelled, item back to pending");
                return None;
            }
        }

        Some(FileOutcome {
            name: item.name.clone(),
            status: item.status,
            error_message: item.error_message.clone(),
        })
    }

    /// Abort and roll back every uploading item (or a single one when `only`
    /// is set). Rolled-back items are excluded from further claims in the
    /// current run. Returns how many items changed.
    pub(crate) fn rollback_uploading(&self, only: Option<u64>) -> usize {
        let (changed, snapshot) = {
            let mut state = self.state.lock().unwrap();
            let mut rolled: Vec<u64> = Vec::new();
            for item in &mut state.items {
                if item.status != UploadStatus::Uploading {
                    continue;
                }
                if let Some(id) = only {
                    if item.id != id {
                        continue;
                    }
                }
                if let Some(handle) = item.cancel.take() {
                    handle.request();
                }
                item.status = UploadStatus::Pending;
                item.progress = 0;
                item.error_message = None;
                rolled.push(item.id);
            }
            for id in &rolled {
                state.skip.insert(*id);
            }
            (rolled.len(), state.items.clone())
        };
        if changed > 0 {
            self.notify_queue_update(&snapshot);
        }
        changed
    }
}

/// True while the item still carries the claiming worker's handle. A
/// cancelled or removed-and-re-added item fails this check, so a late
/// transfer outcome cannot resurrect it.
fn claim_still_held(item: &QueueItem, handle: &CancelHandle) -> bool {
    item.cancel.as_ref().is_some_and(|h| h.same_as(handle))
}
