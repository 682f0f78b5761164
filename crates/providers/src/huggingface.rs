//! Adapter for the Hugging Face inference API.
//!
//! Text-generation models echo the prompt at the start of `generated_text`;
//! the echo is stripped so the adapter honors the plain-text contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};

use kiosk_core::{ModelId, ProviderAdapter, ProviderError, ProviderKind};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

pub struct HuggingFaceAdapter {
    id: ModelId,
    http: Client,
    base_url: String,
    api_key: Secret<String>,
    max_prompt_chars: usize,
}

impl HuggingFaceAdapter {
    pub fn new(http: Client, model: impl Into<String>, api_key: Secret<String>) -> Self {
        Self {
            id: ModelId::new(ProviderKind::HuggingFace, model),
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            max_prompt_chars: 4_000,
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

fn parse_reply(body: &Value, prompt: &str) -> Result<String, ProviderError> {
    let generated = http::non_empty_text(body, "/0/generated_text")?;
    let stripped = generated
        .strip_prefix(prompt.trim())
        .map(str::trim)
        .unwrap_or(&generated);
    if stripped.is_empty() {
        return Err(ProviderError::InvalidResponse(
            "generation contained only the prompt echo".to_string(),
        ));
    }
    Ok(stripped.to_string())
}

#[async_trait]
impl ProviderAdapter for HuggingFaceAdapter {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let payload = json!({"inputs": prompt});

        let response = self
            .http
            .post(format!("{}/models/{}", self.base_url, self.id.model))
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| http::map_transport_error(e, timeout))?;

        let body = http::read_json(response, timeout).await?;
        parse_reply(&body, prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_strips_prompt_echo() {
        let body = json!([{"generated_text": "What is Rust? Rust is a systems language."}]);
        assert_eq!(
            parse_reply(&body, "What is Rust?").unwrap(),
            "Rust is a systems language."
        );
    }

    #[test]
    fn test_parse_reply_without_echo() {
        let body = json!([{"generated_text": "A systems language."}]);
        assert_eq!(
            parse_reply(&body, "What is Rust?").unwrap(),
            "A systems language."
        );
    }

    #[test]
    fn test_parse_reply_echo_only_is_invalid() {
        let body = json!([{"generated_text": "What is Rust?"}]);
        assert!(parse_reply(&body, "What is Rust?").is_err());
    }
}
