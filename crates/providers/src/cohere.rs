//! Adapter for the Cohere chat API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};

use kiosk_core::{ModelId, ProviderAdapter, ProviderError, ProviderKind};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api.cohere.com";

pub struct CohereAdapter {
    id: ModelId,
    http: Client,
    base_url: String,
    api_key: Secret<String>,
    max_prompt_chars: usize,
}

impl CohereAdapter {
    pub fn new(http: Client, model: impl Into<String>, api_key: Secret<String>) -> Self {
        Self {
            id: ModelId::new(ProviderKind::Cohere, model),
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            max_prompt_chars: 16_000,
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
    http::non_empty_text(body, "/text")
}

#[async_trait]
impl ProviderAdapter for CohereAdapter {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let payload = json!({
            "model": self.id.model,
            "message": prompt,
        });

        let response = self
            .http
            .post(format!("{}/v1/chat", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
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
        let body = json!({"text": "Certainly.", "generation_id": "abc"});
        assert_eq!(parse_reply(&body).unwrap(), "Certainly.");
    }
}
