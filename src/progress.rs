//! Derived progress and status aggregation over the queue.
//!
//! Pure functions of a queue snapshot; no synchronization of their own.

use crate::item::{QueueItem, UploadStatus};

/// Status counts for a queue snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub uploading: usize,
    pub success: usize,
    pub error: usize,
}

/// Count items per status.
pub fn queue_stats(items: &[QueueItem]) -> QueueStats {
    let mut stats = QueueStats {
        total: items.len(),
        ..QueueStats::default()
    };
    for item in items {
        match item.status {
            UploadStatus::Pending => stats.pending += 1,
            UploadStatus::Uploading => stats.uploading += 1,
            UploadStatus::Success => stats.success += 1,
            UploadStatus::Error => stats.error += 1,
        }
    }
    stats
}

/// Overall percent: rounded mean of per-item contributions (0 for pending,
/// live percent while uploading, 100 for terminal states). 0 for an empty queue.
pub fn overall_progress(items: &[QueueItem]) -> u8 {
    if items.is_empty() {
        return 0;
    }
    let sum: u32 = items.iter().map(|i| i.progress_contribution()).sum();
    ((sum as f64 / items.len() as f64).round()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::QueueItem;
    use std::path::PathBuf;

    fn item(status: UploadStatus, progress: u8) -> QueueItem {
        let mut it = QueueItem::new(0, PathBuf::from("x.mp4"), "x.mp4".into(), 10);
        it.status = status;
        it.progress = progress;
        it
    }

    #[test]
    fn empty_queue_is_zero() {
        assert_eq!(overall_progress(&[]), 0);
    }

    #[test]
    fn mixed_statuses_rounded_mean() {
        // (100 + 100 + 40 + 0) / 4 = 60
        let items = [
            item(UploadStatus::Success, 100),
            item(UploadStatus::Error, 100),
            item(UploadStatus::Uploading, 40),
            item(UploadStatus::Pending, 0),
        ];
        assert_eq!(overall_progress(&items), 60);
    }

    #[test]
    fn terminal_counts_as_hundred_regardless_of_progress_field() {
        // A terminal item contributes 100 even if its progress field lagged.
        let items = [item(UploadStatus::Success, 0), item(UploadStatus::Pending, 0)];
        assert_eq!(overall_progress(&items), 50);
    }

    #[test]
    fn rounding_to_nearest() {
        let items = [
            item(UploadStatus::Uploading, 33),
            item(UploadStatus::Pending, 0),
        ];
        // 16.5 rounds to 17 (round half away from zero).
        assert_eq!(overall_progress(&items), 17);
    }

    #[test]
    fn stats_count_each_status() {
        let items = [
            item(UploadStatus::Pending, 0),
            item(UploadStatus::Uploading, 10),
            item(UploadStatus::Uploading, 90),
            item(UploadStatus::Success, 100),
            item(UploadStatus::Error, 100),
        ];
        let s = queue_stats(&items);
        assert_eq!(s.total, 5);
        assert_eq!(s.pending, 1);
        assert_eq!(s.uploading, 2);
        assert_eq!(s.success, 1);
        assert_eq!(s.error, 1);
    }
}
