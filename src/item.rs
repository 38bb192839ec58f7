//! Queue items and their lifecycle state.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle state of one queued upload.
///
/// `Pending -> Uploading -> Success | Error`; cancellation rolls `Uploading`
/// back to `Pending`, and `retry_failed` rolls `Error` back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    /// True for `Success` and `Error` (no further transition without an
    /// explicit retry or re-enqueue).
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Success | UploadStatus::Error)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Success => "success",
            UploadStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Cooperative abort token for one in-flight transfer. The transport's
/// progress callback checks it and aborts the transfer once set.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort; the transfer stops at its next progress event.
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Identity comparison; used to discard stale completions after an item
    /// was cancelled or removed while its transfer was still unwinding.
    pub(crate) fn same_as(&self, other: &CancelHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One file's upload unit. Snapshots handed to observers are clones; the
/// queue's copy is the single source of truth.
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// Unique within the owning queue, assigned at enqueue, stable for life.
    pub id: u64,
    /// Payload file; owned by the item until upload completes or it is removed.
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    /// Human-readable size, e.g. "12.30 MB".
    pub size_display: String,
    pub status: UploadStatus,
    /// 0-100; live while `Uploading`, 100 in terminal states, 0 otherwise.
    pub progress: u8,
    /// Set only in `Error`.
    pub error_message: Option<String>,
    /// Server reply body, set only in `Success`.
    pub result: Option<serde_json::Value>,
    /// Abort token, present only while `Uploading`.
    pub(crate) cancel: Option<CancelHandle>,
}

impl QueueItem {
    pub(crate) fn new(id: u64, path: PathBuf, name: String, size_bytes: u64) -> Self {
        Self {
            id,
            path,
            name,
            size_bytes,
            size_display: format_size(size_bytes),
            status: UploadStatus::Pending,
            progress: 0,
            error_message: None,
            result: None,
            cancel: None,
        }
    }

    /// Per-item contribution to the overall progress mean.
    pub(crate) fn progress_contribution(&self) -> u32 {
        match self.status {
            UploadStatus::Pending => 0,
            UploadStatus::Uploading => self.progress as u32,
            UploadStatus::Success | UploadStatus::Error => 100,
        }
    }
}

/// Render a byte count with binary units ("512 B", "12.30 MB").
pub fn format_size(size_bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size_bytes, UNITS[unit])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(12_897_485), "12.30 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn terminal_states() {
        assert!(!UploadStatus::Pending.is_terminal());
        assert!(!UploadStatus::Uploading.is_terminal());
        assert!(UploadStatus::Success.is_terminal());
        assert!(UploadStatus::Error.is_terminal());
    }

    #[test]
    fn cancel_handle_identity() {
        let a = CancelHandle::new();
        let b = CancelHandle::new();
        let a2 = a.clone();
        assert!(a.same_as(&a2));
        assert!(!a.same_as(&b));
        assert!(!a.is_requested());
        a2.request();
        assert!(a.is_requested());
    }
}
