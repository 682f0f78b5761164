//! Shared HTTP plumbing for provider adapters.

use std::time::Duration;

use kiosk_core::ProviderError;
use serde_json::Value;

/// Map a reqwest transport error into the adapter error taxonomy.
pub(crate) fn map_transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if err.is_decode() {
        ProviderError::InvalidResponse(err.to_string())
    } else {
        // Connection refused, DNS failure, TLS trouble: the provider is not
        // reachable from our side.
        ProviderError::Unavailable(err.to_string())
    }
}

/// Check the status line and decode the JSON body.
///
/// 429 maps to RateLimited; any other non-2xx to Unavailable with a bounded
/// excerpt of the body for the logs.
pub(crate) async fn read_json(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<Value, ProviderError> {
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimited(format!("http {status}")));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(200).collect();
        return Err(ProviderError::Unavailable(format!(
            "http {status}: {excerpt}"
        )));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| map_transport_error(e, timeout))
}

/// Pull a non-empty string out of a JSON pointer path, trimmed.
pub(crate) fn non_empty_text(body: &Value, pointer: &str) -> Result<String, ProviderError> {
    let text = body
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if text.is_empty() {
        return Err(ProviderError::InvalidResponse(format!(
            "missing or empty field at {pointer}"
        )));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_empty_text() {
        let body = json!({"choices": [{"message": {"content": "  hi  "}}]});
        let text = non_empty_text(&body, "/choices/0/message/content").unwrap();
        assert_eq!(text, "hi");

        let err = non_empty_text(&body, "/choices/1/message/content").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));

        let empty = json!({"text": "   "});
        assert!(non_empty_text(&empty, "/text").is_err());
    }
}
