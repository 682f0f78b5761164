//! Mock implementations of core traits for testing.
//!
//! These mocks are used across the workspace so gateway and server tests can
//! script provider behavior without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::traits::ProviderAdapter;
use crate::types::ModelId;

/// Scripted provider adapter.
///
/// Queued outcomes are consumed first; once the queue is empty every call
/// returns the default outcome.
pub struct MockAdapter {
    id: ModelId,
    default: Result<String, ProviderError>,
    queue: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
    max_prompt_chars: usize,
}

impl MockAdapter {
    /// Create a mock that always succeeds with `text`.
    pub fn succeeding(id: ModelId, text: impl Into<String>) -> Self {
        Self {
            id,
            default: Ok(text.into()),
            queue: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            max_prompt_chars: 8_000,
        }
    }

    /// Create a mock that always fails with `err`.
    pub fn failing(id: ModelId, err: ProviderError) -> Self {
        Self {
            id,
            default: Err(err),
            queue: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            max_prompt_chars: 8_000,
        }
    }

    /// Queue a one-shot outcome ahead of the default.
    pub fn push_outcome(&self, outcome: Result<String, ProviderError>) {
        self.queue
            .lock()
            .expect("mock queue poisoned")
            .push_back(outcome);
    }

    /// Shrink the prompt budget, for truncation tests.
    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.max_prompt_chars = max;
        self
    }

    /// Number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    async fn call(&self, _prompt: &str, _timeout: Duration) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self
            .queue
            .lock()
            .expect("mock queue poisoned")
            .pop_front();
        queued.unwrap_or_else(|| self.default.clone())
    }
}

/// Adapter that records the prompt it was called with.
pub struct RecordingAdapter {
    inner: MockAdapter,
    prompts: Mutex<Vec<String>>,
}

impl RecordingAdapter {
    /// Create a recording mock that succeeds with `text`.
    pub fn new(id: ModelId, text: impl Into<String>) -> Self {
        Self {
            inner: MockAdapter::succeeding(id, text),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Shrink the prompt budget, for truncation tests.
    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.inner = self.inner.with_max_prompt_chars(max);
        self
    }

    /// Prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl ProviderAdapter for RecordingAdapter {
    fn id(&self) -> &ModelId {
        self.inner.id()
    }

    fn max_prompt_chars(&self) -> usize {
        self.inner.max_prompt_chars()
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        self.inner.call(prompt, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderKind;

    #[tokio::test]
    async fn test_mock_adapter_default_and_queue() {
        let id = ModelId::new(ProviderKind::Ollama, "neural-chat");
        let mock = MockAdapter::succeeding(id, "hello");
        mock.push_outcome(Err(ProviderError::Unavailable("down".into())));

        let first = mock.call("hi", Duration::from_secs(1)).await;
        assert!(first.is_err());

        let second = mock.call("hi", Duration::from_secs(1)).await.unwrap();
        assert_eq!(second, "hello");
        assert_eq!(mock.call_count(), 2);
    }
}
