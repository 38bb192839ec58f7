//! Per-run summary assembled from settled items.

use crate::item::UploadStatus;

/// Terminal record of one item within a run.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub name: String,
    pub status: UploadStatus,
    pub error_message: Option<String>,
}

/// Outcome of one completed run: counts plus per-item records. Cancelled
/// runs produce no summary.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    pub files: Vec<FileOutcome>,
}

impl RunSummary {
    pub(crate) fn from_settled(files: Vec<FileOutcome>) -> Self {
        let success = files
            .iter()
            .filter(|f| f.status == UploadStatus::Success)
            .count();
        let failed = files
            .iter()
            .filter(|f| f.status == UploadStatus::Error)
            .count();
        Self {
            success,
            failed,
            total: files.len(),
            files,
        }
    }
}
