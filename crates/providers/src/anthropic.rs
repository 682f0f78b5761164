//! Adapter for the Anthropic messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};

use kiosk_core::{ModelId, ProviderAdapter, ProviderError, ProviderKind};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    id: ModelId,
    http: Client,
    base_url: String,
    api_key: Secret<String>,
    max_prompt_chars: usize,
}

impl AnthropicAdapter {
    pub fn new(http: Client, model: impl Into<String>, api_key: Secret<String>) -> Self {
        Self {
            id: ModelId::new(ProviderKind::Anthropic, model),
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
    http::non_empty_text(body, "/content/0/text")
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let payload = json!({
            "model": self.id.model,
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
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
            "content": [{"type": "text", "text": "Hello there."}],
            "stop_reason": "end_turn"
        });
        assert_eq!(parse_reply(&body).unwrap(), "Hello there.");
    }

    #[test]
    fn test_parse_reply_empty_content() {
        let body = json!({"content": []});
        assert!(parse_reply(&body).is_err());
    }
}
