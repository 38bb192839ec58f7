//! Classify an HTTP status + response body into an upload outcome.
//!
//! The endpoint reserves 401 for authorization failure, 413 for storage
//! quota rejection, and 408 for a server-side timeout. Any 2xx reply must be
//! JSON with an explicit `success` flag; other statuses are generic failures
//! whose `error` field, when parseable, becomes the message.

use serde::Deserialize;
use serde_json::Value;

pub(crate) const STATUS_UNAUTHORIZED: u32 = 401;
pub(crate) const STATUS_TIMEOUT: u32 = 408;
pub(crate) const STATUS_QUOTA_EXCEEDED: u32 = 413;

pub(crate) const UNAUTHORIZED_MESSAGE: &str = "Unauthorized, please re-authenticate";
pub(crate) const TIMEOUT_MESSAGE: &str = "The server timed out processing the upload";
pub(crate) const NETWORK_MESSAGE: &str = "Network error during upload";
pub(crate) const MALFORMED_MESSAGE: &str = "Invalid server response";
pub(crate) const REJECTED_MESSAGE: &str = "Upload rejected by server";

/// Result of one upload attempt as seen by the scheduler.
#[derive(Debug, Clone)]
pub(crate) enum UploadOutcome {
    /// 2xx with `success: true`; carries the whole reply body.
    Success(Value),
    /// Any failure with its user-facing message. Never produced for an abort.
    Failure(String),
    /// Aborted through the item's cancel handle; rolled back, not an error.
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct ServerReply {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    formatted: Option<QuotaDetail>,
}

#[derive(Debug, Deserialize)]
struct QuotaDetail {
    #[serde(default)]
    usage: Option<String>,
    #[serde(default)]
    limit: Option<String>,
}

/// Map a completed HTTP exchange to an outcome. `body` is the raw reply.
pub(crate) fn classify_response(code: u32, body: &[u8]) -> UploadOutcome {
    match code {
        STATUS_UNAUTHORIZED => UploadOutcome::Failure(UNAUTHORIZED_MESSAGE.to_string()),
        STATUS_TIMEOUT => UploadOutcome::Failure(TIMEOUT_MESSAGE.to_string()),
        STATUS_QUOTA_EXCEEDED => UploadOutcome::Failure(quota_message(body)),
        200..=299 => classify_success_range(body),
        _ => UploadOutcome::Failure(generic_failure_message(code, body)),
    }
}

fn classify_success_range(body: &[u8]) -> UploadOutcome {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return UploadOutcome::Failure(MALFORMED_MESSAGE.to_string()),
    };
    if value.get("success").and_then(Value::as_bool) == Some(true) {
        return UploadOutcome::Success(value);
    }
    let message = value
        .get("error")
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
        .unwrap_or(REJECTED_MESSAGE);
    UploadOutcome::Failure(message.to_string())
}

/// Quota rejection: the body's human-readable message, with usage/limit
/// detail appended when the server provides it.
fn quota_message(body: &[u8]) -> String {
    let reply: ServerReply = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(_) => return format!("HTTP {}", STATUS_QUOTA_EXCEEDED),
    };
    let mut message = reply
        .message
        .or(reply.error)
        .unwrap_or_else(|| "Storage limit exceeded".to_string());
    if let Some(detail) = reply.formatted {
        if let Some(usage) = detail.usage {
            message.push_str(&format!("\nCurrent: {}", usage));
        }
        if let Some(limit) = detail.limit {
            message.push_str(&format!("\nLimit: {}", limit));
        }
    }
    message
}

fn generic_failure_message(code: u32, body: &[u8]) -> String {
    if let Ok(reply) = serde_json::from_slice::<ServerReply>(body) {
        if let Some(error) = reply.error {
            return error;
        }
    }
    format!("HTTP {}", code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_message(outcome: UploadOutcome) -> String {
        match outcome {
            UploadOutcome::Failure(m) => m,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn success_flag_true_resolves_with_body() {
        let body = br#"{"success":true,"result":{"fileId":42}}"#;
        match classify_response(200, body) {
            UploadOutcome::Success(v) => {
                assert_eq!(v["result"]["fileId"], 42);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn success_status_with_false_flag_uses_body_message() {
        let body = br#"{"success":false,"error":"title too long"}"#;
        assert_eq!(failure_message(classify_response(200, body)), "title too long");
    }

    #[test]
    fn success_status_without_flag_is_rejected() {
        let body = br#"{"ok":1}"#;
        assert_eq!(failure_message(classify_response(200, body)), REJECTED_MESSAGE);
    }

    #[test]
    fn malformed_success_body() {
        assert_eq!(
            failure_message(classify_response(200, b"<html>oops</html>")),
            MALFORMED_MESSAGE
        );
    }

    #[test]
    fn unauthorized_is_fixed_message_regardless_of_body() {
        let body = br#"{"error":"something else entirely"}"#;
        assert_eq!(failure_message(classify_response(401, body)), UNAUTHORIZED_MESSAGE);
    }

    #[test]
    fn timeout_is_fixed_message() {
        assert_eq!(failure_message(classify_response(408, b"")), TIMEOUT_MESSAGE);
    }

    #[test]
    fn quota_message_includes_usage_and_limit() {
        let body =
            br#"{"message":"Storage limit exceeded","formatted":{"usage":"10GB","limit":"10GB"}}"#;
        assert_eq!(
            failure_message(classify_response(413, body)),
            "Storage limit exceeded\nCurrent: 10GB\nLimit: 10GB"
        );
    }

    #[test]
    fn quota_message_without_detail() {
        let body = br#"{"message":"Storage limit exceeded"}"#;
        assert_eq!(
            failure_message(classify_response(413, body)),
            "Storage limit exceeded"
        );
    }

    #[test]
    fn quota_with_unparseable_body_falls_back_to_status() {
        assert_eq!(failure_message(classify_response(413, b"nope")), "HTTP 413");
    }

    #[test]
    fn generic_failure_uses_error_field_when_parseable() {
        let body = br#"{"error":"database unavailable"}"#;
        assert_eq!(
            failure_message(classify_response(500, body)),
            "database unavailable"
        );
    }

    #[test]
    fn generic_failure_falls_back_to_status_code() {
        assert_eq!(failure_message(classify_response(502, b"Bad Gateway")), "HTTP 502");
        assert_eq!(failure_message(classify_response(500, b"")), "HTTP 500");
    }
}
