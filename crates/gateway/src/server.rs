//! Axum-based HTTP server for the kiosk gateway.

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use kiosk_analytics::{AnalyticsStore, InteractionRecord};
use kiosk_core::{ChatRequest, Error, ModelId, Result};

use crate::cache::{CacheStats, LruResponseCache};
use crate::gateway::ModelGateway;
use crate::sessions::InMemorySessionStore;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Gateway facade.
    pub gateway: Arc<ModelGateway>,
    /// Kiosk sessions.
    pub sessions: Arc<InMemorySessionStore>,
    /// Response cache, when enabled (kept concrete for the stats surface).
    pub cache: Option<Arc<LruResponseCache>>,
    /// Analytics store, when enabled.
    pub analytics: Option<Arc<AnalyticsStore>>,
    /// Startup instant for the uptime counter.
    pub started_at: Instant,
}

/// Kiosk gateway server.
///
/// The shared state is assembled in [`build_router`], so every `with_*`
/// builder call before that point takes effect.
///
/// [`build_router`]: KioskServer::build_router
pub struct KioskServer {
    config: ServerOptions,
    gateway: Arc<ModelGateway>,
    sessions: Arc<InMemorySessionStore>,
    cache: Option<Arc<LruResponseCache>>,
    analytics: Option<Arc<AnalyticsStore>>,
    metrics_handle: Option<PrometheusHandle>,
    started_at: Instant,
}

impl KioskServer {
    /// Create a new server.
    pub fn new(
        config: ServerOptions,
        gateway: Arc<ModelGateway>,
        sessions: Arc<InMemorySessionStore>,
        cache: Option<Arc<LruResponseCache>>,
    ) -> Self {
        Self {
            config,
            gateway,
            sessions,
            cache,
            analytics: None,
            metrics_handle: None,
            started_at: Instant::now(),
        }
    }

    /// Attach the analytics store.
    pub fn with_analytics(mut self, analytics: Arc<AnalyticsStore>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let state = Arc::new(AppState {
            gateway: self.gateway.clone(),
            sessions: self.sessions.clone(),
            cache: self.cache.clone(),
            analytics: self.analytics.clone(),
            started_at: self.started_at,
        });

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/api/chat", post(chat_handler))
            .route("/api/models", get(models_handler))
            .route("/api/switch-model", post(switch_model_handler))
            .route("/api/stats", get(stats_handler))
            .with_state(state);

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        if self.config.enable_cors {
            router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %addr, "Kiosk gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::gateway(format!("Server error: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// Visitor's question.
    pub message: String,
    /// Optional session ID; a fresh one is minted when absent.
    pub session_id: Option<String>,
    /// Optional per-request model override, as `provider:model`.
    pub model: Option<String>,
    /// Optional reply language code.
    pub language: Option<String>,
}

/// Chat reply.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    /// Answer text.
    pub response: String,
    /// Session the answer belongs to.
    pub session_id: String,
    /// How the answer was produced.
    pub metadata: ChatMetadata,
}

#[derive(Debug, Serialize)]
pub struct ChatMetadata {
    /// Model that produced the answer.
    pub model_used: String,
    /// Wall-clock seconds spent answering; 0.0 on a cache hit.
    pub response_time: f64,
    /// Whether the answer came from cache.
    pub cached: bool,
}

/// Models listing.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Default fallback chain, primary first.
    pub models: Vec<String>,
    /// Model the queried session would use next.
    pub active_model: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub session_id: Option<String>,
}

/// Switch-model request body.
#[derive(Debug, Deserialize)]
pub struct SwitchModelBody {
    pub session_id: String,
    /// `provider:model` to pin, or omitted/`"default"` to clear the override.
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SwitchModelResponse {
    pub session_id: String,
    pub active_model: String,
}

/// Stats response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub sessions: usize,
    pub model_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<kiosk_analytics::Insights>,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_model: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        primary_model: state
            .gateway
            .registry()
            .primary()
            .map(ToString::to_string),
    })
}

/// Chat handler.
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatBody>,
) -> Response {
    let started = Instant::now();
    let session_id = payload
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::info!(
        session_id = %session_id,
        message_len = payload.message.len(),
        "Processing chat request"
    );

    let request_model = match payload.model.as_deref() {
        Some(raw) => match raw.parse::<ModelId>() {
            Ok(id) => Some(id),
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, e.to_string());
            }
        },
        None => None,
    };

    let session = state.sessions.get_or_create(&session_id);
    if let Some(language) = &payload.language {
        state.sessions.set_language(&session_id, language.clone());
    }
    let language = payload.language.or(session.language);

    // Per-request override beats the session's pinned model.
    let override_model = request_model.or(session.current_model);

    let request = ChatRequest {
        prompt: payload.message,
        session_id: Some(session_id.clone()),
        language_hint: language.clone(),
    };

    match state.gateway.ask(&request, override_model.as_ref()).await {
        Ok(answer) => {
            state.sessions.record_question(&session_id, false);
            log_interaction(
                &state,
                InteractionRecord {
                    session_id: session_id.clone(),
                    model_used: answer.model_used.to_string(),
                    prompt_chars: request.prompt.chars().count(),
                    latency_seconds: answer.latency_seconds,
                    cached: answer.cached,
                    errored: false,
                    language,
                },
            )
            .await;
            kiosk_telemetry::metrics::track_request(
                "POST",
                "/api/chat",
                200,
                started.elapsed().as_secs_f64(),
            );

            Json(ChatReply {
                response: answer.text,
                session_id,
                metadata: ChatMetadata {
                    model_used: answer.model_used.to_string(),
                    response_time: answer.latency_seconds,
                    cached: answer.cached,
                },
            })
            .into_response()
        }
        Err(err) => {
            state.sessions.record_question(&session_id, true);
            log_interaction(
                &state,
                InteractionRecord {
                    session_id: session_id.clone(),
                    model_used: "none".to_string(),
                    prompt_chars: request.prompt.chars().count(),
                    latency_seconds: started.elapsed().as_secs_f64(),
                    cached: false,
                    errored: true,
                    language,
                },
            )
            .await;

            let (status, message) = match &err {
                Error::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                Error::UnknownModel(model) => (
                    StatusCode::BAD_REQUEST,
                    format!("unknown model '{}'", model),
                ),
                Error::AllProvidersExhausted { attempts } => {
                    tracing::error!(
                        session_id = %session_id,
                        attempts = attempts.len(),
                        "Every provider failed"
                    );
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "All assistants are busy right now. Please try again in a moment."
                            .to_string(),
                    )
                }
                other => {
                    tracing::error!(session_id = %session_id, error = %other, "Chat request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Something went wrong. Please try again.".to_string(),
                    )
                }
            };
            kiosk_telemetry::metrics::track_request(
                "POST",
                "/api/chat",
                status.as_u16(),
                started.elapsed().as_secs_f64(),
            );
            error_response(status, message)
        }
    }
}

/// List the configured chain and the session's active model.
async fn models_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelsQuery>,
) -> Response {
    let registry = state.gateway.registry();
    let models: Vec<String> = registry.chain().iter().map(ToString::to_string).collect();

    // A lookup must not mint a session for an ID we have never chatted with.
    let session_override = query
        .session_id
        .as_deref()
        .and_then(|id| state.sessions.get(id))
        .and_then(|session| session.current_model);

    let active_model = session_override
        .map(|m| m.to_string())
        .or_else(|| registry.primary().map(ToString::to_string));

    match active_model {
        Some(active_model) => Json(ModelsResponse {
            models,
            active_model,
        })
        .into_response(),
        None => error_response(StatusCode::SERVICE_UNAVAILABLE, "no providers configured"),
    }
}

/// Pin or clear a session's model override.
async fn switch_model_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SwitchModelBody>,
) -> Response {
    let registry = state.gateway.registry();

    let model = match payload.model.as_deref() {
        None | Some("default") | Some("") => None,
        Some(raw) => match raw.parse::<ModelId>() {
            Ok(id) if registry.contains(&id) => Some(id),
            Ok(id) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("unknown model '{}'", id),
                );
            }
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
    };

    state
        .sessions
        .set_model(&payload.session_id, model.clone());
    tracing::info!(
        session_id = %payload.session_id,
        model = model.as_ref().map(ToString::to_string).unwrap_or_else(|| "default".to_string()),
        "Session model switched"
    );

    let active_model = model
        .map(|m| m.to_string())
        .or_else(|| registry.primary().map(ToString::to_string))
        .unwrap_or_else(|| "none".to_string());

    Json(SwitchModelResponse {
        session_id: payload.session_id,
        active_model,
    })
    .into_response()
}

/// Operational stats handler.
async fn stats_handler(State(state): State<Arc<AppState>>) -> Response {
    let insights = match &state.analytics {
        Some(analytics) => match analytics.insights(7).await {
            Ok(insights) => Some(insights),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read analytics insights");
                None
            }
        },
        None => None,
    };

    Json(StatsResponse {
        uptime_seconds: state.started_at.elapsed().as_secs(),
        sessions: state.sessions.len(),
        model_chain: state
            .gateway
            .registry()
            .chain()
            .iter()
            .map(ToString::to_string)
            .collect(),
        cache: state.cache.as_ref().map(|c| c.stats()),
        insights,
    })
    .into_response()
}

/// Record the interaction, warning instead of failing the request.
async fn log_interaction(state: &AppState, record: InteractionRecord) {
    if let Some(analytics) = &state.analytics {
        if let Err(e) = analytics.log_interaction(record).await {
            tracing::warn!(error = %e, "Failed to record interaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_providers::AdapterRegistry;
    use std::time::Duration;

    #[tokio::test]
    async fn test_health_handler() {
        let gateway = Arc::new(ModelGateway::new(
            Arc::new(AdapterRegistry::new()),
            Duration::from_secs(5),
            None,
        ));
        let state = Arc::new(AppState {
            gateway,
            sessions: Arc::new(InMemorySessionStore::new()),
            cache: None,
            analytics: None,
            started_at: Instant::now(),
        });

        let response = health_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
