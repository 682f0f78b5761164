//! Adapter for a local Ollama inference server.
//!
//! Consumes the loopback HTTP API (`/api/generate`); the server itself is an
//! external collaborator and is not managed here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use kiosk_core::{ModelId, ProviderAdapter, ProviderError, ProviderKind};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaAdapter {
    id: ModelId,
    http: Client,
    base_url: String,
    max_prompt_chars: usize,
}

impl OllamaAdapter {
    pub fn new(http: Client, model: impl Into<String>) -> Self {
        Self {
            id: ModelId::new(ProviderKind::Ollama, model),
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
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

/// Extract the reply from an `/api/generate` payload.
fn parse_reply(body: &Value) -> Result<String, ProviderError> {
    http::non_empty_text(body, "/response")
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let payload = json!({
            "model": self.id.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
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
        let body = json!({"model": "neural-chat", "response": "Hello!\n", "done": true});
        assert_eq!(parse_reply(&body).unwrap(), "Hello!");
    }

    #[test]
    fn test_parse_reply_rejects_empty() {
        let body = json!({"model": "neural-chat", "response": "", "done": true});
        assert!(matches!(
            parse_reply(&body),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
