//! Shared types for the kiosk gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Backend capable of generating a text reply to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Local inference server reachable over loopback HTTP.
    Ollama,
    OpenAi,
    Anthropic,
    HuggingFace,
    Cohere,
    Google,
    Mistral,
    Replicate,
}

impl ProviderKind {
    /// Stable tag used in model identifiers, config keys, and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::HuggingFace => "huggingface",
            Self::Cohere => "cohere",
            Self::Google => "google",
            Self::Mistral => "mistral",
            Self::Replicate => "replicate",
        }
    }

    /// Whether this provider needs a credential to be usable.
    ///
    /// Ollama runs on loopback and is the only keyless backend.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Environment variable consulted when the config file carries no key.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Ollama => None,
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::HuggingFace => Some("HF_API_TOKEN"),
            Self::Cohere => Some("COHERE_API_KEY"),
            Self::Google => Some("GOOGLE_API_KEY"),
            Self::Mistral => Some("MISTRAL_API_KEY"),
            Self::Replicate => Some("REPLICATE_API_TOKEN"),
        }
    }

    /// All supported providers, in no particular order.
    pub fn all() -> &'static [ProviderKind] {
        &[
            Self::Ollama,
            Self::OpenAi,
            Self::Anthropic,
            Self::HuggingFace,
            Self::Cohere,
            Self::Google,
            Self::Mistral,
            Self::Replicate,
        ]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "huggingface" => Ok(Self::HuggingFace),
            "cohere" => Ok(Self::Cohere),
            "google" => Ok(Self::Google),
            "mistral" => Ok(Self::Mistral),
            "replicate" => Ok(Self::Replicate),
            other => Err(Error::UnknownModel(format!("unknown provider '{other}'"))),
        }
    }
}

/// Opaque identifier naming a provider + model pair, e.g. `ollama:neural-chat`.
///
/// Immutable once constructed; used as part of cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId {
    /// Backing provider.
    pub provider: ProviderKind,
    /// Provider-side model name.
    pub model: String,
}

impl ModelId {
    /// Create a new model identifier.
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s
            .split_once(':')
            .ok_or_else(|| Error::UnknownModel(format!("'{s}' is not provider:model")))?;
        if model.trim().is_empty() {
            return Err(Error::UnknownModel(format!("'{s}' has an empty model name")));
        }
        Ok(Self {
            provider: provider.parse()?,
            model: model.to_string(),
        })
    }
}

// Serialized as the display string so API payloads and config stay readable.
impl Serialize for ModelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One user turn. Created per request, never persisted beyond it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// User prompt text.
    pub prompt: String,
    /// Opaque session identifier, when the surface tracks one.
    pub session_id: Option<String>,
    /// Optional locale tag, advisory only.
    pub language_hint: Option<String>,
}

impl ChatRequest {
    /// Build a sessionless request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: None,
            language_hint: None,
        }
    }
}

/// Normalized result returned to the calling surface.
///
/// Invariant: corresponds to exactly one successful adapter call or one
/// cache hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Reply text with provider wrapping stripped.
    pub text: String,
    /// Model that produced the text.
    pub model_used: ModelId,
    /// Wall-clock latency of the producing call; zero on cache hits.
    pub latency_seconds: f64,
    /// Whether this response was served from the cache.
    pub cached: bool,
    /// Unix timestamp (seconds) of construction.
    pub timestamp: i64,
}

/// Per-surface session state. The gateway is stateless with respect to
/// sessions except for reading `current_model`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    /// Opaque session identifier.
    pub session_id: String,
    /// Override for the default primary model, if the user switched.
    pub current_model: Option<ModelId>,
    /// Questions asked in this session.
    pub question_count: u64,
    /// Errors surfaced to this session.
    pub error_count: u64,
    /// Preferred language code, unset until the user picks one.
    pub language: Option<String>,
}

impl SessionState {
    /// Create a fresh session.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            current_model: None,
            question_count: 0,
            error_count: 0,
            language: None,
        }
    }
}

/// Normalize a prompt for cache keying: lowercase, trim, collapse whitespace.
pub fn normalize_prompt(prompt: &str) -> String {
    prompt
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive a cache key from a normalized prompt and the active model.
///
/// The same prompt against different models is a different entry.
pub fn cache_key(normalized_prompt: &str, model: &ModelId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_prompt.as_bytes());
    hasher.update([0u8]);
    hasher.update(model.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_roundtrip() {
        let id: ModelId = "ollama:neural-chat".parse().unwrap();
        assert_eq!(id.provider, ProviderKind::Ollama);
        assert_eq!(id.model, "neural-chat");
        assert_eq!(id.to_string(), "ollama:neural-chat");
    }

    #[test]
    fn test_model_id_keeps_colons_in_model_name() {
        let id: ModelId = "ollama:llama3.1:8b".parse().unwrap();
        assert_eq!(id.model, "llama3.1:8b");
    }

    #[test]
    fn test_model_id_rejects_bad_input() {
        assert!("neural-chat".parse::<ModelId>().is_err());
        assert!("frobnicate:model".parse::<ModelId>().is_err());
        assert!("openai:".parse::<ModelId>().is_err());
    }

    #[test]
    fn test_model_id_serde_as_string() {
        let id = ModelId::new(ProviderKind::OpenAi, "gpt-4o-mini");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"openai:gpt-4o-mini\"");
        let back: ModelId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_keyless_providers_have_no_env_var() {
        for kind in ProviderKind::all() {
            assert_eq!(kind.requires_api_key(), kind.api_key_env().is_some());
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_normalize_prompt() {
        assert_eq!(normalize_prompt("  What   IS\tRust? "), "what is rust?");
        assert_eq!(normalize_prompt("   "), "");
    }

    #[test]
    fn test_cache_key_varies_by_model() {
        let a = ModelId::new(ProviderKind::Ollama, "neural-chat");
        let b = ModelId::new(ProviderKind::OpenAi, "gpt-4o-mini");
        let prompt = normalize_prompt("hello there");
        assert_ne!(cache_key(&prompt, &a), cache_key(&prompt, &b));
        assert_eq!(cache_key(&prompt, &a), cache_key(&prompt, &a));
    }
}
