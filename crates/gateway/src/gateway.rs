//! Gateway facade: normalization, cache, fallback, response shaping.
//!
//! Every surface (HTTP, terminal) funnels through [`ModelGateway::ask`] so
//! cache and fallback behavior stay identical regardless of how a question
//! arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kiosk_core::{
    cache_key, normalize_prompt, ChatRequest, ChatResponse, Error, ModelId, ResponseCache, Result,
};
use kiosk_providers::AdapterRegistry;

use crate::sequencer::FallbackSequencer;

pub struct ModelGateway {
    registry: Arc<AdapterRegistry>,
    sequencer: FallbackSequencer,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl ModelGateway {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        attempt_timeout: Duration,
        cache: Option<Arc<dyn ResponseCache>>,
    ) -> Self {
        let sequencer = FallbackSequencer::new(registry.clone(), attempt_timeout);
        Self {
            registry,
            sequencer,
            cache,
        }
    }

    /// The registry this gateway dispatches against.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Answer a question, consulting the cache before dispatching.
    ///
    /// `override_model` (a per-session or per-request selection) becomes the
    /// head of the fallback chain for this call. It must name a configured
    /// adapter, on or off the default chain.
    pub async fn ask(
        &self,
        request: &ChatRequest,
        override_model: Option<&ModelId>,
    ) -> Result<ChatResponse> {
        let normalized = normalize_prompt(&request.prompt);
        if normalized.is_empty() {
            return Err(Error::invalid_request("message must not be empty"));
        }

        if let Some(model) = override_model {
            if !self.registry.contains(model) {
                return Err(Error::UnknownModel(model.to_string()));
            }
        }

        let active = match override_model.or_else(|| self.registry.primary()) {
            Some(model) => model.clone(),
            None => return Err(Error::gateway("no providers configured")),
        };

        let key = cache_key(&normalized, &active);
        if let Some(cache) = &self.cache {
            if let Some(mut hit) = cache.lookup(&key) {
                tracing::debug!(model = %hit.model_used, "Cache hit");
                kiosk_telemetry::metrics::track_cache(true);
                hit.cached = true;
                hit.latency_seconds = 0.0;
                return Ok(hit);
            }
            kiosk_telemetry::metrics::track_cache(false);
        }

        // Normalization is for cache keying only; the model gets the user's
        // text as typed, casing and line structure intact.
        let chain = self.chain_for(&active);
        let started = Instant::now();
        let (text, model_used) = self.sequencer.resolve(request.prompt.trim(), &chain).await?;
        let latency = started.elapsed().as_secs_f64();

        let response = ChatResponse {
            text,
            model_used,
            latency_seconds: latency,
            cached: false,
            timestamp: chrono::Utc::now().timestamp(),
        };

        if let Some(cache) = &self.cache {
            cache.store(&key, &response);
        }

        Ok(response)
    }

    /// Default chain with `active` moved (or prepended) to the front.
    fn chain_for(&self, active: &ModelId) -> Vec<ModelId> {
        let mut chain = Vec::with_capacity(self.registry.chain().len() + 1);
        chain.push(active.clone());
        for id in self.registry.chain() {
            if id != active {
                chain.push(id.clone());
            }
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LruResponseCache;
    use kiosk_core::mocks::{MockAdapter, RecordingAdapter};
    use kiosk_core::{ProviderError, ProviderKind};

    fn model(name: &str) -> ModelId {
        ModelId::new(ProviderKind::Ollama, name)
    }

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            prompt: prompt.to_string(),
            session_id: None,
            language_hint: None,
        }
    }

    fn gateway_with(
        adapters: Vec<Arc<MockAdapter>>,
        cache: Option<Arc<dyn ResponseCache>>,
    ) -> ModelGateway {
        let mut registry = AdapterRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        ModelGateway::new(Arc::new(registry), Duration::from_secs(5), cache)
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let gateway = gateway_with(
            vec![Arc::new(MockAdapter::succeeding(model("a"), "hi"))],
            None,
        );
        let err = gateway.ask(&request("   \t  "), None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_repeat_question_served_from_cache() {
        let adapter = Arc::new(MockAdapter::succeeding(model("a"), "the answer"));
        let cache: Arc<dyn ResponseCache> =
            Arc::new(LruResponseCache::new(16, Duration::from_secs(60)));
        let gateway = gateway_with(vec![adapter.clone()], Some(cache));

        let first = gateway.ask(&request("What Time Is It?"), None).await.unwrap();
        assert!(!first.cached);

        // Same question, different casing and spacing.
        let second = gateway
            .ask(&request("  what   time is it?"), None)
            .await
            .unwrap();
        assert!(second.cached);
        assert_eq!(second.latency_seconds, 0.0);
        assert_eq!(second.text, "the answer");
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_receives_the_verbatim_prompt() {
        let adapter = Arc::new(RecordingAdapter::new(model("a"), "ok"));
        let mut registry = AdapterRegistry::new();
        registry.register(adapter.clone());
        let gateway = ModelGateway::new(Arc::new(registry), Duration::from_secs(5), None);

        let prompt = "Explain this Rust error:\nfn main() { LET x = 1; }";
        gateway.ask(&request(prompt), None).await.unwrap();

        // Casing and newlines reach the model untouched.
        assert_eq!(adapter.prompts(), vec![prompt.to_string()]);
    }

    #[tokio::test]
    async fn test_cache_keys_are_model_scoped() {
        let a = Arc::new(MockAdapter::succeeding(model("a"), "from a"));
        let b = Arc::new(MockAdapter::succeeding(model("b"), "from b"));
        let cache: Arc<dyn ResponseCache> =
            Arc::new(LruResponseCache::new(16, Duration::from_secs(60)));
        let gateway = gateway_with(vec![a, b], Some(cache));

        let first = gateway.ask(&request("hello"), None).await.unwrap();
        let second = gateway
            .ask(&request("hello"), Some(&model("b")))
            .await
            .unwrap();

        assert_eq!(first.text, "from a");
        assert_eq!(second.text, "from b");
        assert!(!second.cached);
    }

    #[tokio::test]
    async fn test_override_moves_model_to_chain_head() {
        let a = Arc::new(MockAdapter::succeeding(model("a"), "from a"));
        let b = Arc::new(MockAdapter::succeeding(model("b"), "from b"));
        let gateway = gateway_with(vec![a.clone(), b], None);

        let response = gateway
            .ask(&request("hello"), Some(&model("b")))
            .await
            .unwrap();

        assert_eq!(response.model_used, model("b"));
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn test_override_still_falls_back_to_chain() {
        let a = Arc::new(MockAdapter::succeeding(model("a"), "from a"));
        let b = Arc::new(MockAdapter::failing(
            model("b"),
            ProviderError::Unavailable("down".to_string()),
        ));
        let gateway = gateway_with(vec![a, b], None);

        let response = gateway
            .ask(&request("hello"), Some(&model("b")))
            .await
            .unwrap();

        assert_eq!(response.model_used, model("a"));
        assert_eq!(response.text, "from a");
    }

    #[tokio::test]
    async fn test_off_chain_override_heads_the_chain() {
        let a = Arc::new(MockAdapter::succeeding(model("a"), "from a"));
        let c = Arc::new(MockAdapter::succeeding(model("c"), "from c"));
        let mut registry = AdapterRegistry::new();
        registry.register(a.clone());
        registry.register_off_chain(c);
        let gateway = ModelGateway::new(Arc::new(registry), Duration::from_secs(5), None);

        let response = gateway
            .ask(&request("hello"), Some(&model("c")))
            .await
            .unwrap();

        assert_eq!(response.model_used, model("c"));
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_override_rejected() {
        let gateway = gateway_with(
            vec![Arc::new(MockAdapter::succeeding(model("a"), "hi"))],
            None,
        );
        let err = gateway
            .ask(&request("hello"), Some(&model("ghost")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownModel(_)));
    }

    #[tokio::test]
    async fn test_exhaustion_propagates() {
        let a = Arc::new(MockAdapter::failing(
            model("a"),
            ProviderError::Unavailable("down".to_string()),
        ));
        let gateway = gateway_with(vec![a], None);

        let err = gateway.ask(&request("hello"), None).await.unwrap_err();
        assert!(matches!(err, Error::AllProvidersExhausted { .. }));
    }
}
