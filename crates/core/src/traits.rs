//! Core traits for the kiosk gateway.
//!
//! These traits define the contracts between the gateway facade and its
//! collaborators: provider adapters and the response cache.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{ChatResponse, ModelId};

/// Normalization layer between the gateway and one provider's wire format.
///
/// An adapter issues exactly one outbound call per invocation and never
/// retries; the fallback sequencer owns retry-by-fallback semantics. On
/// success the reply text is returned with provider-specific wrapping
/// (markup, role tags) stripped.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Identifier of the provider + model pair this adapter speaks for.
    fn id(&self) -> &ModelId;

    /// Per-adapter prompt length budget in characters. Callers truncate
    /// before invoking `call`.
    fn max_prompt_chars(&self) -> usize {
        8_000
    }

    /// Issue one call to the backing service.
    ///
    /// `prompt` is non-empty after trimming; `timeout` bounds the whole
    /// exchange.
    async fn call(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError>;
}

/// Bounded cache of recent question/answer pairs.
///
/// Best-effort only: implementations must never let a cache fault prevent a
/// request from being served, and must not block a lookup on a concurrent
/// miss for the same key.
pub trait ResponseCache: Send + Sync {
    /// Look up a previously stored response. Expired entries are misses.
    fn lookup(&self, key: &str) -> Option<ChatResponse>;

    /// Store a response, evicting the least-recently-accessed entry if the
    /// capacity would be exceeded.
    fn store(&self, key: &str, response: &ChatResponse);
}
