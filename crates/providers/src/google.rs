//! Adapter for the Google Generative Language API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};

use kiosk_core::{ModelId, ProviderAdapter, ProviderError, ProviderKind};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GoogleAdapter {
    id: ModelId,
    http: Client,
    base_url: String,
    api_key: Secret<String>,
    max_prompt_chars: usize,
}

impl GoogleAdapter {
    pub fn new(http: Client, model: impl Into<String>, api_key: Secret<String>) -> Self {
        Self {
            id: ModelId::new(ProviderKind::Google, model),
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            max_prompt_chars: 24_000,
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

fn parse_reply(body: &Value) -> Result<String, ProviderError> {
    http::non_empty_text(body, "/candidates/0/content/parts/0/text")
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.id.model
        );

        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.expose_secret())])
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
    fn test_parse_reply() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Sure thing."}], "role": "model"},
                "finishReason": "STOP"
            }]
        });
        assert_eq!(parse_reply(&body).unwrap(), "Sure thing.");
    }

    #[test]
    fn test_parse_reply_blocked_candidate() {
        let body = json!({"candidates": [{"finishReason": "SAFETY"}]});
        assert!(parse_reply(&body).is_err());
    }
}
