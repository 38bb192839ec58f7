//! Upload run scheduling: worker pool, run handle, and summaries.

mod run;
mod summary;

pub use summary::{FileOutcome, RunSummary};

pub(crate) use run::spawn_run;

use std::thread;

/// Handle to an in-flight run started by `start_upload`. Joining is
/// optional; the run also reports through the registered observers.
#[derive(Debug)]
pub struct RunHandle {
    handle: thread::JoinHandle<Option<RunSummary>>,
}

impl RunHandle {
    pub(crate) fn new(handle: thread::JoinHandle<Option<RunSummary>>) -> Self {
        Self { handle }
    }

    /// Wait for the run to end. `None` means it was cancelled (a cancelled
    /// run produces no summary).
    pub fn join(self) -> Option<RunSummary> {
        match self.handle.join() {
            Ok(summary) => summary,
            Err(_) => {
                tracing::warn!("upload run coordinator panicked");
                None
            }
        }
    }

    /// True once the run has ended, without blocking.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
