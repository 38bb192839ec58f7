//! One file's upload: multipart POST via curl with progress and abort.
//!
//! Builds the form (file part, anti-forgery token, per-attempt extra fields),
//! performs the transfer, and classifies the response. The progress callback
//! doubles as the cooperative cancellation point: once the item's cancel
//! handle is set, it returns `false` and curl aborts the transfer.

mod classify;

pub(crate) use classify::UploadOutcome;

use classify::NETWORK_MESSAGE;

use crate::config::{UploadConfig, TOKEN_FIELD_NAME};
use crate::item::CancelHandle;
use std::path::Path;
use std::time::Duration;

/// Perform one upload attempt for `path`. Emits clamped percentages through
/// `on_progress` as bytes go out. Never imposes a wall-clock timeout: only
/// the reserved 408 status communicates a timeout, and arbitrarily large
/// files may take arbitrarily long.
pub(crate) fn upload_file(
    config: &UploadConfig,
    path: &Path,
    cancel: &CancelHandle,
    on_progress: &mut dyn FnMut(u8),
) -> UploadOutcome {
    let form = match build_form(config, path) {
        Ok(form) => form,
        Err(e) => return UploadOutcome::Failure(format!("upload setup failed: {}", e)),
    };

    let mut easy = curl::easy::Easy::new();
    if let Err(e) = configure(&mut easy, config, form) {
        return UploadOutcome::Failure(format!("upload setup failed: {}", e));
    }

    let mut body: Vec<u8> = Vec::new();
    let perform_result = {
        let mut last_percent: Option<u8> = None;
        let mut transfer = easy.transfer();
        if let Err(e) = transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        }) {
            return UploadOutcome::Failure(format!("upload setup failed: {}", e));
        }
        if let Err(e) = transfer.progress_function(|_dltotal, _dlnow, ultotal, ulnow| {
            if cancel.is_requested() {
                return false;
            }
            if ultotal > 0.0 {
                let percent = ((ulnow / ultotal) * 100.0).clamp(0.0, 100.0) as u8;
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    on_progress(percent);
                }
            }
            true
        }) {
            return UploadOutcome::Failure(format!("upload setup failed: {}", e));
        }
        transfer.perform()
    };

    if let Err(e) = perform_result {
        if e.is_aborted_by_callback() {
            return UploadOutcome::Cancelled;
        }
        tracing::debug!(url = %config.upload_url, error = %e, "transfer failed before a response");
        return UploadOutcome::Failure(NETWORK_MESSAGE.to_string());
    }

    let code = match easy.response_code() {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = %e, "no response code after transfer");
            return UploadOutcome::Failure(NETWORK_MESSAGE.to_string());
        }
    };

    classify::classify_response(code, &body)
}

/// Multipart form: the file under the configured field name, the
/// anti-forgery token, and the extra-fields supplier's map (evaluated
/// freshly for this attempt).
fn build_form(config: &UploadConfig, path: &Path) -> Result<curl::easy::Form, curl::FormError> {
    let mut form = curl::easy::Form::new();
    form.part(&config.file_field_name).file(path).add()?;
    if let Some(token) = &config.anti_forgery_token {
        form.part(TOKEN_FIELD_NAME).contents(token.as_bytes()).add()?;
    }
    if let Some(supplier) = &config.extra_fields {
        for (name, value) in supplier() {
            form.part(&name).contents(value.as_bytes()).add()?;
        }
    }
    Ok(form)
}

fn configure(
    easy: &mut curl::easy::Easy,
    config: &UploadConfig,
    form: curl::easy::Form,
) -> Result<(), curl::Error> {
    easy.url(&config.upload_url)?;
    easy.httppost(form)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    // Progress events drive both the percent reporting and abort checks.
    easy.progress(true)?;
    Ok(())
}
