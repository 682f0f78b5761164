//! Error types for the kiosk gateway.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::types::ModelId;

/// Result type alias using the kiosk gateway's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the kiosk gateway.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Gateway Errors
    // =========================================================================
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    // =========================================================================
    // Provider Adapter Errors
    // =========================================================================
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("All providers exhausted after {} attempt(s)", .attempts.len())]
    AllProvidersExhausted { attempts: Vec<ProviderFailure> },

    // =========================================================================
    // Cache Errors
    // =========================================================================
    #[error("Cache error: {0}")]
    Cache(String),

    // =========================================================================
    // Analytics Errors
    // =========================================================================
    #[error("Analytics error: {0}")]
    Analytics(String),

    // =========================================================================
    // Configuration & Telemetry Errors
    // =========================================================================
    #[error("Config error: {0}")]
    Config(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a cache error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create an analytics error.
    pub fn analytics(msg: impl Into<String>) -> Self {
        Self::Analytics(msg.into())
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a telemetry error.
    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::Telemetry(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Error raised by a single provider adapter call.
///
/// Adapters never retry; recovery lives in the fallback sequencer.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Connection refused, process not running, or the service rejected us.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider signalled throttling. Sequenced like Unavailable but
    /// logged distinctly.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider answered with a malformed or empty payload.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call exceeded its configured deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Classification of this error, without the detail text.
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Unavailable(_) => ProviderErrorKind::Unavailable,
            Self::RateLimited(_) => ProviderErrorKind::RateLimited,
            Self::InvalidResponse(_) => ProviderErrorKind::InvalidResponse,
            Self::Timeout(_) => ProviderErrorKind::Timeout,
        }
    }
}

/// Provider error classification used in diagnostics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Unavailable,
    RateLimited,
    InvalidResponse,
    Timeout,
}

impl ProviderErrorKind {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::RateLimited => "rate_limited",
            Self::InvalidResponse => "invalid_response",
            Self::Timeout => "timeout",
        }
    }
}

/// One failed adapter attempt, recorded by the fallback sequencer.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderFailure {
    /// Model that was attempted.
    pub model: ModelId,
    /// Failure classification.
    pub kind: ProviderErrorKind,
    /// Human-readable detail, logged but never shown to end users.
    pub detail: String,
}

impl ProviderFailure {
    /// Record a failure from a provider error.
    pub fn new(model: ModelId, err: &ProviderError) -> Self {
        Self {
            model,
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderKind;

    #[test]
    fn test_provider_error_kind() {
        let err = ProviderError::RateLimited("429".to_string());
        assert_eq!(err.kind(), ProviderErrorKind::RateLimited);
        assert_eq!(err.kind().as_str(), "rate_limited");

        let err = ProviderError::Timeout(Duration::from_secs(5));
        assert_eq!(err.kind(), ProviderErrorKind::Timeout);
    }

    #[test]
    fn test_exhausted_message_counts_attempts() {
        let model = ModelId::new(ProviderKind::Ollama, "neural-chat");
        let err = Error::AllProvidersExhausted {
            attempts: vec![ProviderFailure::new(
                model,
                &ProviderError::Unavailable("connection refused".to_string()),
            )],
        };
        assert!(err.to_string().contains("1 attempt"));
    }
}
