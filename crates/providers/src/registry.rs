//! Adapter registry and startup wiring.
//!
//! The registry is built once from configuration, is read-only afterwards,
//! and owns the default fallback chain (primary first).

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use secrecy::Secret;

use kiosk_core::config::{AppConfig, ProviderSettings};
use kiosk_core::{Error, ModelId, ProviderAdapter, ProviderKind, Result};

use crate::{
    anthropic::AnthropicAdapter, cohere::CohereAdapter, google::GoogleAdapter,
    huggingface::HuggingFaceAdapter, mistral::MistralAdapter, ollama::OllamaAdapter,
    openai::OpenAiAdapter, replicate::ReplicateAdapter,
};

pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    chain: Vec<ModelId>,
}

impl AdapterRegistry {
    /// Create an empty registry. Adapters are added with [`register`].
    ///
    /// [`register`]: AdapterRegistry::register
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            chain: Vec::new(),
        }
    }

    /// Register an adapter and append it to the fallback chain.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let id = adapter.id().clone();
        self.adapters.insert(id.to_string(), adapter);
        if !self.chain.contains(&id) {
            self.chain.push(id);
        }
    }

    /// Register an adapter without putting it on the default chain.
    ///
    /// Such a model is reachable only through a session override.
    pub fn register_off_chain(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let id = adapter.id().clone();
        self.adapters.insert(id.to_string(), adapter);
    }

    /// Build the registry from configuration.
    ///
    /// A chain entry whose provider is disabled or missing its credential is
    /// skipped with a warning; startup only fails if nothing survives.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Self::from_config_with_env(cfg, &|var| std::env::var(var).ok())
    }

    /// [`from_config`] with an injectable credential lookup, so tests can
    /// supply keys without touching the process environment.
    ///
    /// [`from_config`]: AdapterRegistry::from_config
    pub fn from_config_with_env(
        cfg: &AppConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let http = Client::new();
        let mut registry = Self::new();

        for entry in &cfg.gateway.model_chain {
            let id: ModelId = match entry.parse() {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(entry = %entry, error = %e, "Skipping malformed chain entry");
                    continue;
                }
            };

            let default_settings = ProviderSettings::default();
            let settings = cfg
                .providers
                .get(id.provider.as_str())
                .unwrap_or(&default_settings);

            if !settings.enabled {
                tracing::info!(model = %id, "Provider disabled in config, skipping");
                continue;
            }

            match build_adapter(&http, &id, settings, env) {
                Some(adapter) => {
                    tracing::info!(model = %id, "Registered provider adapter");
                    registry.register(adapter);
                }
                None => {
                    tracing::warn!(
                        model = %id,
                        "No credential for provider, removing from chain"
                    );
                }
            }
        }

        if registry.chain.is_empty() {
            return Err(Error::config(
                "no usable providers: every chain entry was disabled, malformed, or missing a credential",
            ));
        }

        Ok(registry)
    }

    /// Look up the adapter for a model.
    pub fn get(&self, id: &ModelId) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&id.to_string()).cloned()
    }

    /// Whether the model is configured, on or off the default chain.
    pub fn contains(&self, id: &ModelId) -> bool {
        self.adapters.contains_key(&id.to_string())
    }

    /// The default fallback chain, primary first.
    pub fn chain(&self) -> &[ModelId] {
        &self.chain
    }

    /// The primary model, if any adapter made it onto the chain.
    pub fn primary(&self) -> Option<&ModelId> {
        self.chain.first()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the credential for a provider: explicit config first, then the
/// provider's conventional environment variable via `env`.
fn resolve_api_key(
    kind: ProviderKind,
    settings: &ProviderSettings,
    env: &dyn Fn(&str) -> Option<String>,
) -> Option<Secret<String>> {
    if let Some(key) = &settings.api_key {
        return Some(key.clone());
    }
    kind.api_key_env()
        .and_then(env)
        .filter(|v| !v.trim().is_empty())
        .map(Secret::new)
}

fn build_adapter(
    http: &Client,
    id: &ModelId,
    settings: &ProviderSettings,
    env: &dyn Fn(&str) -> Option<String>,
) -> Option<Arc<dyn ProviderAdapter>> {
    let key = resolve_api_key(id.provider, settings, env);
    if id.provider.requires_api_key() && key.is_none() {
        return None;
    }

    let adapter: Arc<dyn ProviderAdapter> = match id.provider {
        ProviderKind::Ollama => {
            let mut adapter = OllamaAdapter::new(http.clone(), &id.model);
            if let Some(url) = &settings.base_url {
                adapter = adapter.with_base_url(url);
            }
            if let Some(max) = settings.max_prompt_chars {
                adapter = adapter.with_max_prompt_chars(max);
            }
            Arc::new(adapter)
        }
        ProviderKind::OpenAi => {
            let mut adapter = OpenAiAdapter::new(http.clone(), &id.model, key?);
            if let Some(url) = &settings.base_url {
                adapter = adapter.with_base_url(url);
            }
            if let Some(max) = settings.max_prompt_chars {
                adapter = adapter.with_max_prompt_chars(max);
            }
            Arc::new(adapter)
        }
        ProviderKind::Anthropic => {
            let mut adapter = AnthropicAdapter::new(http.clone(), &id.model, key?);
            if let Some(url) = &settings.base_url {
                adapter = adapter.with_base_url(url);
            }
            if let Some(max) = settings.max_prompt_chars {
                adapter = adapter.with_max_prompt_chars(max);
            }
            Arc::new(adapter)
        }
        ProviderKind::HuggingFace => {
            let mut adapter = HuggingFaceAdapter::new(http.clone(), &id.model, key?);
            if let Some(url) = &settings.base_url {
                adapter = adapter.with_base_url(url);
            }
            if let Some(max) = settings.max_prompt_chars {
                adapter = adapter.with_max_prompt_chars(max);
            }
            Arc::new(adapter)
        }
        ProviderKind::Cohere => {
            let mut adapter = CohereAdapter::new(http.clone(), &id.model, key?);
            if let Some(url) = &settings.base_url {
                adapter = adapter.with_base_url(url);
            }
            if let Some(max) = settings.max_prompt_chars {
                adapter = adapter.with_max_prompt_chars(max);
            }
            Arc::new(adapter)
        }
        ProviderKind::Google => {
            let mut adapter = GoogleAdapter::new(http.clone(), &id.model, key?);
            if let Some(url) = &settings.base_url {
                adapter = adapter.with_base_url(url);
            }
            if let Some(max) = settings.max_prompt_chars {
                adapter = adapter.with_max_prompt_chars(max);
            }
            Arc::new(adapter)
        }
        ProviderKind::Mistral => {
            let mut adapter = MistralAdapter::new(http.clone(), &id.model, key?);
            if let Some(url) = &settings.base_url {
                adapter = adapter.with_base_url(url);
            }
            if let Some(max) = settings.max_prompt_chars {
                adapter = adapter.with_max_prompt_chars(max);
            }
            Arc::new(adapter)
        }
        ProviderKind::Replicate => {
            let mut adapter = ReplicateAdapter::new(http.clone(), &id.model, key?);
            if let Some(url) = &settings.base_url {
                adapter = adapter.with_base_url(url);
            }
            if let Some(max) = settings.max_prompt_chars {
                adapter = adapter.with_max_prompt_chars(max);
            }
            Arc::new(adapter)
        }
    };

    Some(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::config::GatewayConfig;
    use kiosk_core::mocks::MockAdapter;

    fn chain_config(chain: &[&str]) -> AppConfig {
        AppConfig {
            gateway: GatewayConfig {
                model_chain: chain.iter().map(|s| s.to_string()).collect(),
                ..GatewayConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_register_preserves_order() {
        let mut registry = AdapterRegistry::new();
        let a = ModelId::new(ProviderKind::Ollama, "neural-chat");
        let b = ModelId::new(ProviderKind::Ollama, "gemma:2b");
        registry.register(Arc::new(MockAdapter::succeeding(a.clone(), "a")));
        registry.register(Arc::new(MockAdapter::succeeding(b.clone(), "b")));

        assert_eq!(registry.chain(), &[a.clone(), b]);
        assert_eq!(registry.primary(), Some(&a));
    }

    #[test]
    fn test_off_chain_registration() {
        let mut registry = AdapterRegistry::new();
        let a = ModelId::new(ProviderKind::Ollama, "neural-chat");
        let c = ModelId::new(ProviderKind::Ollama, "phi3:mini");
        registry.register(Arc::new(MockAdapter::succeeding(a.clone(), "a")));
        registry.register_off_chain(Arc::new(MockAdapter::succeeding(c.clone(), "c")));

        assert!(registry.contains(&c));
        assert_eq!(registry.chain(), &[a]);
    }

    #[test]
    fn test_from_config_skips_missing_credentials() {
        // Ollama needs no key; the hosted entry has neither a config key nor
        // an environment credential.
        let cfg = chain_config(&["ollama:neural-chat", "cohere:command-r"]);

        let registry = AdapterRegistry::from_config_with_env(&cfg, &|_| None).unwrap();
        assert_eq!(registry.chain().len(), 1);
        assert_eq!(registry.primary().unwrap().to_string(), "ollama:neural-chat");
    }

    #[test]
    fn test_from_config_picks_up_env_credential() {
        let cfg = chain_config(&["cohere:command-r"]);

        let registry = AdapterRegistry::from_config_with_env(&cfg, &|var| {
            (var == "COHERE_API_KEY").then(|| "test-key".to_string())
        })
        .unwrap();
        assert_eq!(registry.chain().len(), 1);
        assert_eq!(registry.primary().unwrap().to_string(), "cohere:command-r");
    }

    #[test]
    fn test_from_config_empty_chain_is_an_error() {
        let cfg = chain_config(&["replicate:meta/llama-2-70b-chat", "not-a-model"]);
        assert!(AdapterRegistry::from_config_with_env(&cfg, &|_| None).is_err());
    }

    #[test]
    fn test_from_config_respects_disabled_flag() {
        let mut cfg = chain_config(&["ollama:neural-chat", "ollama:gemma:2b"]);
        cfg.providers.insert(
            "ollama".to_string(),
            ProviderSettings {
                enabled: false,
                ..ProviderSettings::default()
            },
        );
        assert!(AdapterRegistry::from_config_with_env(&cfg, &|_| None).is_err());
    }
}
