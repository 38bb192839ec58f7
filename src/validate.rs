//! Candidate validation: decides whether a file may enter the queue.
//!
//! A candidate is accepted when its extension (case-insensitive trailing
//! dot-segment of the name) is in the allowed extension set, or its declared
//! MIME type is in the allowed MIME set. Deliberately OR, not AND: a file
//! with no MIME type but a correct extension is still accepted.

use crate::config::UploadConfig;
use std::path::{Path, PathBuf};

/// A file offered to `add_files`, with its optionally declared MIME type.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub mime_type: Option<String>,
}

impl Candidate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime_type: None,
        }
    }

    pub fn with_mime(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: Some(mime_type.into()),
        }
    }

    /// Display name: final path component, or the whole path if there is none.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Result of one `add_files` call: how many entered the queue and the display
/// names of those that did not.
#[derive(Debug, Clone, Default)]
pub struct AddOutcome {
    pub added: usize,
    pub rejected: Vec<String>,
}

/// Extension of `name` taken from the trailing dot-segment, lowercased.
/// `None` when the name has no dot or ends with one.
pub(crate) fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// True when the candidate may enter the queue under `cfg`'s allow-lists.
pub(crate) fn is_acceptable(cfg: &UploadConfig, name: &str, mime_type: Option<&str>) -> bool {
    if let Some(ext) = extension_of(name) {
        if cfg
            .allowed_extensions
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        {
            return true;
        }
    }
    if let Some(mime) = mime_type {
        if cfg
            .allowed_mime_types
            .iter()
            .any(|a| a.eq_ignore_ascii_case(mime))
        {
            return true;
        }
    }
    false
}

/// Size of the payload on disk; `Err` means the candidate must be rejected
/// (an unreadable file would only fail later, mid-run).
pub(crate) fn payload_size(path: &Path) -> std::io::Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}
