//! The bounded worker pool driving one upload run.
//!
//! N workers (N = clamped concurrency, capped by the pending count) loop over
//! claim -> upload -> finish until no claimable item remains or the run is
//! cancelled. A coordinator thread collects settled records over an mpsc
//! channel and produces the run summary; the blocking `recv` means a freed
//! slot is signaled by worker loop turnover, never polled.

use crate::queue::store::QueueInner;
use crate::scheduler::{FileOutcome, RunSummary};
use crate::transport;
use std::sync::atomic::Ordering;
use std::sync::{mpsc, Arc};
use std::thread;

/// Spawn the coordinator for one run. The returned thread resolves to the
/// run summary, or `None` when the run was cancelled.
pub(crate) fn spawn_run(
    inner: Arc<QueueInner>,
    run_id: u64,
    workers: usize,
) -> thread::JoinHandle<Option<RunSummary>> {
    thread::spawn(move || {
        let (tx, rx) = mpsc::channel::<FileOutcome>();
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let inner = Arc::clone(&inner);
            let tx = tx.clone();
            handles.push(thread::spawn(move || worker_loop(inner, run_id, tx)));
        }
        drop(tx);

        // Event-driven: blocks until a worker settles an item; the channel
        // closes once every worker has exited.
        let mut settled: Vec<FileOutcome> = Vec::new();
        while let Ok(outcome) = rx.recv() {
            settled.push(outcome);
        }
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("upload worker panicked");
            }
        }

        // A newer run id means this run was cancelled or the queue cleared.
        let cancelled = inner.run.cancelled.load(Ordering::SeqCst)
            || inner.run.run_id.load(Ordering::SeqCst) != run_id;
        if inner.run.run_id.load(Ordering::SeqCst) == run_id {
            inner.run.active.store(false, Ordering::SeqCst);
        }
        if cancelled {
            tracing::info!(settled = settled.len(), "upload run cancelled, no summary");
            return None;
        }

        let summary = RunSummary::from_settled(settled);
        tracing::info!(
            success = summary.success,
            failed = summary.failed,
            total = summary.total,
            "upload run complete"
        );
        if let Some(cb) = &inner.observers.on_all_complete {
            cb(&summary);
        }
        Some(summary)
    })
}

/// One worker: claim the next pending item, upload it, apply the outcome,
/// repeat. Stops when nothing is claimable or the run is superseded.
fn worker_loop(inner: Arc<QueueInner>, run_id: u64, tx: mpsc::Sender<FileOutcome>) {
    loop {
        if inner.run.cancelled.load(Ordering::SeqCst)
            || inner.run.run_id.load(Ordering::SeqCst) != run_id
        {
            break;
        }
        let Some(claim) = inner.claim_next(run_id) else {
            break;
        };
        tracing::debug!(id = claim.id, name = %claim.name, "claimed upload");
        let mut on_progress = |percent| inner.update_progress(claim.id, &claim.handle, percent);
        let outcome =
            transport::upload_file(&inner.config, &claim.path, &claim.handle, &mut on_progress);
        if let Some(settled) = inner.finish_item(claim.id, &claim.handle, outcome) {
            let _ = tx.send(settled);
        }
    }
}
