use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub providers: HashMap<String, ProviderSettings>,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    /// Ordered fallback chain, primary first, as `provider:model` strings.
    pub model_chain: Vec<String>,
    /// Per-attempt deadline for one adapter call.
    pub attempt_timeout_ms: u64,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum number of cached question/answer pairs.
    pub capacity: usize,
    /// Entries older than this are treated as misses regardless of recency.
    pub ttl_secs: u64,
}

/// Per-provider settings. A provider missing its credential is dropped from
/// the chain at startup rather than failing it.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub api_key: Option<Secret<String>>,
    pub base_url: Option<String>,
    pub max_prompt_chars: Option<usize>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            max_prompt_chars: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub db_path: String,
}

impl AppConfig {
    /// Load layered configuration: `config/default` then the env-specific
    /// file then `config/local`, with `APP__`-prefixed env vars on top
    /// (`APP__SERVER__PORT=8080` maps to `server.port`).
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("KIOSK_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model_chain: vec![
                "ollama:neural-chat".into(),
                "openai:gpt-4o-mini".into(),
                "anthropic:claude-3-haiku-20240307".into(),
            ],
            attempt_timeout_ms: 15_000,
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1_000,
            ttl_secs: 24 * 3600,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: "kiosk_analytics.db".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_is_primary_first() {
        let cfg = AppConfig::default();
        assert!(!cfg.gateway.model_chain.is_empty());
        assert_eq!(cfg.gateway.model_chain[0], "ollama:neural-chat");
    }

    #[test]
    fn test_cache_defaults() {
        let cache = CacheConfig::default();
        assert!(cache.enabled);
        assert_eq!(cache.capacity, 1_000);
        assert_eq!(cache.ttl_secs, 86_400);
    }
}
