//! Adapter for the Replicate predictions API.
//!
//! Uses the synchronous `Prefer: wait` mode so one outbound call yields the
//! finished prediction; the polling workflow is out of scope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};

use kiosk_core::{ModelId, ProviderAdapter, ProviderError, ProviderKind};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

pub struct ReplicateAdapter {
    id: ModelId,
    http: Client,
    base_url: String,
    api_key: Secret<String>,
    max_prompt_chars: usize,
}

impl ReplicateAdapter {
    pub fn new(http: Client, model: impl Into<String>, api_key: Secret<String>) -> Self {
        Self {
            id: ModelId::new(ProviderKind::Replicate, model),
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            max_prompt_chars: 8_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.max_prompt_chars = max;
        self
    }
}

/// Predictions stream their output as a list of text chunks; some models
/// return a single string instead.
fn parse_reply(body: &Value) -> Result<String, ProviderError> {
    let output = body
        .get("output")
        .ok_or_else(|| ProviderError::InvalidResponse("missing output field".to_string()))?;

    let text = match output {
        Value::String(s) => s.trim().to_string(),
        Value::Array(chunks) => chunks
            .iter()
            .filter_map(Value::as_str)
            .collect::<String>()
            .trim()
            .to_string(),
        _ => {
            return Err(ProviderError::InvalidResponse(
                "output is neither string nor array".to_string(),
            ))
        }
    };

    if text.is_empty() {
        return Err(ProviderError::InvalidResponse(
            "prediction output was empty".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl ProviderAdapter for ReplicateAdapter {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let payload = json!({"input": {"prompt": prompt}});

        let response = self
            .http
            .post(format!(
                "{}/v1/models/{}/predictions",
                self.base_url, self.id.model
            ))
            .bearer_auth(self.api_key.expose_secret())
            .header("Prefer", "wait")
            .json(&payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| http::map_transport_error(e, timeout))?;

        let body = http::read_json(response, timeout).await?;
        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_chunked() {
        let body = json!({"status": "succeeded", "output": ["Hel", "lo", " world"]});
        assert_eq!(parse_reply(&body).unwrap(), "Hello world");
    }

    #[test]
    fn test_parse_reply_single_string() {
        let body = json!({"status": "succeeded", "output": "All done."});
        assert_eq!(parse_reply(&body).unwrap(), "All done.");
    }

    #[test]
    fn test_parse_reply_missing_output() {
        let body = json!({"status": "failed", "error": "boom"});
        assert!(parse_reply(&body).is_err());
    }
}
