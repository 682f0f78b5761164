//! Fallback sequencer: orders a primary model and its fallbacks.
//!
//! Retry policy lives here, not in the adapters, so failure semantics stay
//! centralized. Chain order is fixed by configuration; there is no dynamic
//! reordering based on historical latency.

use std::sync::Arc;
use std::time::Duration;

use kiosk_core::{
    Error, ModelId, ProviderError, ProviderErrorKind, ProviderFailure, Result,
};
use kiosk_providers::AdapterRegistry;

/// Iterates a model chain until one adapter succeeds.
pub struct FallbackSequencer {
    registry: Arc<AdapterRegistry>,
    attempt_timeout: Duration,
}

impl FallbackSequencer {
    /// Create a sequencer with a per-attempt deadline.
    pub fn new(registry: Arc<AdapterRegistry>, attempt_timeout: Duration) -> Self {
        Self {
            registry,
            attempt_timeout,
        }
    }

    /// Try each model in `chain` in order; first success wins.
    ///
    /// On exhaustion the error carries the ordered per-adapter failure kinds
    /// for diagnostics.
    pub async fn resolve(&self, prompt: &str, chain: &[ModelId]) -> Result<(String, ModelId)> {
        let mut attempts: Vec<ProviderFailure> = Vec::with_capacity(chain.len());

        for id in chain {
            let Some(adapter) = self.registry.get(id) else {
                tracing::warn!(model = %id, "Chain entry has no configured adapter");
                attempts.push(ProviderFailure {
                    model: id.clone(),
                    kind: ProviderErrorKind::Unavailable,
                    detail: "adapter not configured".to_string(),
                });
                continue;
            };

            let bounded = truncate_to_chars(prompt, adapter.max_prompt_chars());
            if bounded.len() < prompt.len() {
                tracing::debug!(
                    model = %id,
                    budget = adapter.max_prompt_chars(),
                    "Prompt truncated to adapter budget"
                );
            }

            // The outer timeout is the hard deadline; adapters also pass the
            // same bound to their HTTP client.
            let outcome =
                match tokio::time::timeout(self.attempt_timeout, adapter.call(bounded, self.attempt_timeout))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(self.attempt_timeout)),
                };

            match outcome {
                Ok(text) => {
                    tracing::info!(model = %id, fallbacks_tried = attempts.len(), "Adapter call succeeded");
                    kiosk_telemetry::metrics::track_provider(&id.to_string(), "ok");
                    return Ok((text, id.clone()));
                }
                Err(err) => {
                    // Rate limiting sequences like Unavailable but is logged
                    // distinctly.
                    match err.kind() {
                        ProviderErrorKind::RateLimited => {
                            tracing::warn!(model = %id, error = %err, "Provider rate limited, trying next in chain");
                        }
                        kind => {
                            tracing::warn!(model = %id, kind = kind.as_str(), error = %err, "Adapter call failed, trying next in chain");
                        }
                    }
                    kiosk_telemetry::metrics::track_provider(&id.to_string(), err.kind().as_str());
                    attempts.push(ProviderFailure::new(id.clone(), &err));
                }
            }
        }

        Err(Error::AllProvidersExhausted { attempts })
    }
}

/// Truncate to at most `max` characters. Budgets are character counts, so
/// multibyte text keeps its full allowance.
fn truncate_to_chars(prompt: &str, max: usize) -> &str {
    match prompt.char_indices().nth(max) {
        Some((idx, _)) => &prompt[..idx],
        None => prompt,
    }
}
