//! Observer callbacks for queue and upload events.
//!
//! The UI layer registers listeners here; the queue invokes them from worker
//! threads, always after internal locks are released. All callbacks are
//! optional.

use crate::item::QueueItem;
use crate::scheduler::RunSummary;
use std::fmt;

/// Progress update: the triggering item, its own percent, and the overall
/// queue percent.
pub type ProgressFn = Box<dyn Fn(&QueueItem, u8, u8) + Send + Sync>;

/// Terminal transition of one item. `Ok` carries the server reply body,
/// `Err` the failure message. Invoked exactly once per item settled in a run.
pub type FileCompleteFn = Box<dyn Fn(&QueueItem, Result<&serde_json::Value, &str>) + Send + Sync>;

/// End of a completed (not cancelled) run. Invoked exactly once per run.
pub type AllCompleteFn = Box<dyn Fn(&RunSummary) + Send + Sync>;

/// Queue contents after any state transition or structural change.
pub type QueueUpdateFn = Box<dyn Fn(&[QueueItem]) + Send + Sync>;

/// Listener registration for one queue instance.
#[derive(Default)]
pub struct UploadObservers {
    pub(crate) on_progress: Option<ProgressFn>,
    pub(crate) on_file_complete: Option<FileCompleteFn>,
    pub(crate) on_all_complete: Option<AllCompleteFn>,
    pub(crate) on_queue_update: Option<QueueUpdateFn>,
}

impl UploadObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl Fn(&QueueItem, u8, u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_file_complete(
        mut self,
        f: impl Fn(&QueueItem, Result<&serde_json::Value, &str>) + Send + Sync + 'static,
    ) -> Self {
        self.on_file_complete = Some(Box::new(f));
        self
    }

    pub fn on_all_complete(mut self, f: impl Fn(&RunSummary) + Send + Sync + 'static) -> Self {
        self.on_all_complete = Some(Box::new(f));
        self
    }

    pub fn on_queue_update(mut self, f: impl Fn(&[QueueItem]) + Send + Sync + 'static) -> Self {
        self.on_queue_update = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for UploadObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadObservers")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_file_complete", &self.on_file_complete.is_some())
            .field("on_all_complete", &self.on_all_complete.is_some())
            .field("on_queue_update", &self.on_queue_update.is_some())
            .finish()
    }
}
