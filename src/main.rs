#![deny(unused)]
//! Kioskd - Chatbot Kiosk Gateway
//!
//! A provider-dispatch gateway for visitor kiosks: one normalized chat
//! surface over multiple LLM backends with fallback, caching, and usage
//! analytics.

use std::sync::Arc;
use std::time::Duration;

use kiosk_analytics::AnalyticsStore;
use kiosk_core::config::AppConfig;
use kiosk_core::ResponseCache;
use kiosk_gateway::{
    InMemorySessionStore, KioskServer, LruResponseCache, ModelGateway, ServerOptions,
};
use kiosk_providers::AdapterRegistry;

mod terminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    kiosk_telemetry::trace::configure_tracing()?;

    tracing::info!("Starting Kioskd v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load configuration ({}). Using defaults.", e);
            AppConfig::default()
        }
    };

    // =========================================================================
    // Provider registry and fallback chain
    // =========================================================================
    let registry = Arc::new(AdapterRegistry::from_config(&config)?);
    tracing::info!(
        chain = ?registry.chain().iter().map(ToString::to_string).collect::<Vec<_>>(),
        "Provider chain initialized"
    );

    // =========================================================================
    // Response cache
    // =========================================================================
    let cache = if config.gateway.cache.enabled {
        let cache = Arc::new(LruResponseCache::new(
            config.gateway.cache.capacity,
            Duration::from_secs(config.gateway.cache.ttl_secs),
        ));
        tracing::info!(
            capacity = config.gateway.cache.capacity,
            ttl_secs = config.gateway.cache.ttl_secs,
            "Response cache initialized"
        );
        Some(cache)
    } else {
        tracing::info!("Response cache disabled");
        None
    };

    if let Some(cache) = &cache {
        let cache = cache.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(300));
            loop {
                tick.tick().await;
                cache.cleanup();
            }
        });
    }

    // =========================================================================
    // Gateway facade and sessions
    // =========================================================================
    let gateway = Arc::new(ModelGateway::new(
        registry.clone(),
        Duration::from_millis(config.gateway.attempt_timeout_ms),
        cache
            .clone()
            .map(|c| c as Arc<dyn ResponseCache>),
    ));
    let sessions = Arc::new(InMemorySessionStore::new());

    // =========================================================================
    // Analytics
    // =========================================================================
    let analytics = if config.analytics.enabled {
        match AnalyticsStore::open(&config.analytics.db_path) {
            Ok(store) => {
                tracing::info!(path = %config.analytics.db_path, "Analytics store initialized");
                Some(Arc::new(store))
            }
            Err(e) => {
                tracing::warn!("Failed to open analytics store ({}). Continuing without it.", e);
                None
            }
        }
    } else {
        None
    };

    // =========================================================================
    // Terminal mode
    // =========================================================================
    if std::env::args().any(|arg| arg == "--terminal") {
        return terminal::run(gateway, sessions, cache).await;
    }

    // =========================================================================
    // HTTP server
    // =========================================================================
    let metrics_handle = kiosk_telemetry::metrics::setup_metrics_recorder()?;

    let server_config = ServerOptions {
        host: std::env::var("HOST").unwrap_or_else(|_| config.server.host.clone()),
        port: std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(config.server.port),
        enable_cors: true,
        enable_tracing: true,
    };

    let mut server = KioskServer::new(server_config.clone(), gateway, sessions, cache)
        .with_metrics(metrics_handle);
    if let Some(analytics) = analytics {
        server = server.with_analytics(analytics);
    }

    // =========================================================================
    // Print startup banner
    // =========================================================================
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                     Kioskd v{}                            ║", env!("CARGO_PKG_VERSION"));
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Chatbot Kiosk Gateway                                       ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Endpoints:                                                  ║");
    println!("║    GET  /health            - Health check                    ║");
    println!("║    POST /api/chat          - Ask a question                  ║");
    println!("║    GET  /api/models        - List configured models          ║");
    println!("║    POST /api/switch-model  - Pin a session's model           ║");
    println!("║    GET  /api/stats         - Operational stats               ║");
    println!("║    GET  /metrics           - Prometheus metrics              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Server: http://{}:{}                              ║", server_config.host, server_config.port);
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    server.run().await?;
    Ok(())
}
