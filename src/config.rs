//! Per-queue upload configuration.
//!
//! One `UploadConfig` per queue instance, immutable once the queue is built.
//! The concurrency limit is clamped to [1,5] at use, not at construction, so
//! callers can store whatever the surrounding form handed them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Form part name carrying the anti-forgery token (ASP.NET convention of the
/// surrounding dashboard).
pub const TOKEN_FIELD_NAME: &str = "__RequestVerificationToken";

/// Hard bounds on simultaneous in-flight uploads.
pub const MIN_CONCURRENT_UPLOADS: i32 = 1;
pub const MAX_CONCURRENT_UPLOADS: i32 = 5;

/// Supplier of auxiliary form fields, evaluated freshly for every upload
/// attempt so values (e.g. rotating tokens) may change between retries.
pub type ExtraFieldsFn = Arc<dyn Fn() -> HashMap<String, String> + Send + Sync>;

/// Configuration for one upload queue instance.
#[derive(Clone)]
pub struct UploadConfig {
    /// Endpoint receiving every upload of this queue (validated at queue construction).
    pub upload_url: String,
    /// Multipart field name carrying the file.
    pub file_field_name: String,
    /// Allowed file extensions, matched case-insensitively without a leading dot.
    pub allowed_extensions: Vec<String>,
    /// Allowed declared MIME types, matched case-insensitively.
    pub allowed_mime_types: Vec<String>,
    /// Anti-forgery token sent as an additional form part when present.
    pub anti_forgery_token: Option<String>,
    /// Requested concurrency; effective value is `effective_concurrency()`.
    pub concurrent_uploads: i32,
    /// Optional supplier of extra form fields, called once per attempt.
    pub extra_fields: Option<ExtraFieldsFn>,
}

impl UploadConfig {
    /// Config for `upload_url` with the dashboard's media defaults.
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self {
            upload_url: upload_url.into(),
            ..Self::default()
        }
    }

    /// Concurrency limit clamped to [1,5].
    pub fn effective_concurrency(&self) -> usize {
        self.concurrent_uploads
            .clamp(MIN_CONCURRENT_UPLOADS, MAX_CONCURRENT_UPLOADS) as usize
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_url: String::new(),
            file_field_name: "file".to_string(),
            allowed_extensions: ["mp4", "mov", "avi", "mkv", "webm", "flv", "jpg", "jpeg", "png", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_mime_types: [
                "video/mp4",
                "video/quicktime",
                "video/x-msvideo",
                "video/x-matroska",
                "video/webm",
                "image/jpeg",
                "image/png",
                "image/webp",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            anti_forgery_token: None,
            concurrent_uploads: 3,
            extra_fields: None,
        }
    }
}

// Hand-written because `extra_fields` is an opaque closure.
impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("upload_url", &self.upload_url)
            .field("file_field_name", &self.file_field_name)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("allowed_mime_types", &self.allowed_mime_types)
            .field("anti_forgery_token", &self.anti_forgery_token.as_deref().map(|_| "<set>"))
            .field("concurrent_uploads", &self.concurrent_uploads)
            .field("extra_fields", &self.extra_fields.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = UploadConfig::default();
        assert_eq!(cfg.file_field_name, "file");
        assert_eq!(cfg.concurrent_uploads, 3);
        assert!(cfg.allowed_extensions.iter().any(|e| e == "mp4"));
        assert!(cfg.allowed_mime_types.iter().any(|m| m == "video/mp4"));
        assert!(cfg.anti_forgery_token.is_none());
    }

    #[test]
    fn concurrency_clamped_to_range() {
        let mut cfg = UploadConfig::default();
        cfg.concurrent_uploads = 0;
        assert_eq!(cfg.effective_concurrency(), 1);
        cfg.concurrent_uploads = 7;
        assert_eq!(cfg.effective_concurrency(), 5);
        cfg.concurrent_uploads = -1;
        assert_eq!(cfg.effective_concurrency(), 1);
        cfg.concurrent_uploads = 4;
        assert_eq!(cfg.effective_concurrency(), 4);
    }

    #[test]
    fn extra_fields_supplier_reevaluated_per_call() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);
        let mut cfg = UploadConfig::new("http://localhost/upload");
        cfg.extra_fields = Some(Arc::new(move || {
            let n = calls_in.fetch_add(1, Ordering::SeqCst);
            HashMap::from([("attempt".to_string(), n.to_string())])
        }));
        let f = cfg.extra_fields.as_ref().unwrap();
        assert_eq!(f().get("attempt").unwrap(), "0");
        assert_eq!(f().get("attempt").unwrap(), "1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
