//! Shared HTTP client, SSE parsing, and auth utilities.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::ChatcastError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Transport timeout for every upstream call. The turn budget is enforced
/// separately by the response writer.
const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(120);

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(TRANSPORT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for a Bearer-token API. An empty key sends no
/// `Authorization` header.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if api_key.is_empty() {
        return headers;
    }
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Parse an SSE "data:" line, returning None for "[DONE]" and non-data lines.
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Whether an SSE line is the `[DONE]` terminator.
pub fn is_done_marker(line: &str) -> bool {
    line.strip_prefix("data:").map(str::trim) == Some("[DONE]")
}

/// Map a non-success HTTP status and body to an error.
pub fn status_to_error(status: u16, body: &str) -> ChatcastError {
    match status {
        401 | 403 => ChatcastError::Authentication(error_message(body)),
        429 => ChatcastError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ChatcastError::api(status, error_message(body)),
    }
}

/// Pull `error.message` out of a JSON error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_data_lines() {
        assert_eq!(parse_sse_data("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(parse_sse_data("data:{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(parse_sse_data("data: [DONE]"), None);
        assert_eq!(parse_sse_data("event: ping"), None);
        assert!(is_done_marker("data: [DONE]"));
        assert!(!is_done_marker("data: {}"));
    }

    #[test]
    fn empty_key_sends_no_authorization() {
        assert!(bearer_headers("").get(AUTHORIZATION).is_none());
        assert_eq!(bearer_headers("k")[AUTHORIZATION], "Bearer k");
    }

    #[test]
    fn status_mapping_reads_error_message() {
        let err = status_to_error(401, r#"{"error":{"message":"bad key"}}"#);
        assert!(matches!(err, ChatcastError::Authentication(ref m) if m == "bad key"));

        let err = status_to_error(429, r#"{"error":{"retry_after":1.5}}"#);
        assert!(matches!(err, ChatcastError::RateLimited { retry_after_ms: Some(1500) }));

        let err = status_to_error(502, "upstream unavailable");
        assert!(matches!(err, ChatcastError::Api { status: 502, ref message } if message == "upstream unavailable"));
    }
}
