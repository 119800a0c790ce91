//! Relay server setup

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::fallback::FallbackPolicy;
use super::handler::{chat_handler, MODEL_USED_HEADER};
use crate::config::AppConfig;
use crate::upstream::{build_upstream, CompletionUpstream};

/// Shared state for the relay
#[derive(Clone)]
pub struct ProxyState {
    pub config: Arc<AppConfig>,
    /// `None` when no credential is configured; chat requests then fail with 500
    pub upstream: Option<Arc<dyn CompletionUpstream>>,
    pub policy: Arc<FallbackPolicy>,
}

impl ProxyState {
    pub fn new(
        config: AppConfig,
        upstream: Option<Arc<dyn CompletionUpstream>>,
    ) -> Result<Self, regex::Error> {
        let policy = FallbackPolicy::from_config(&config.retry)?;
        Ok(Self {
            config: Arc::new(config),
            upstream,
            policy: Arc::new(policy),
        })
    }
}

/// Routes for the relay
pub fn build_router(state: ProxyState) -> Router {
    let expose: [HeaderName; 1] = [MODEL_USED_HEADER];

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/v1/chat", post(chat_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(expose),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let upstream = build_upstream(&config.upstream)?;
    if upstream.is_none() {
        tracing::warn!("No upstream API key configured; chat requests will fail until MISTRAL_API_KEY is set");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let base_url = config.upstream.base_url().to_string();
    let candidates = config.models.candidates(None);

    let state = ProxyState::new(config, upstream)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("chat-relay listening on {}", addr);
    tracing::info!("Relaying to {} (models: {})", base_url, candidates.join(" -> "));

    Ok(axum::serve(listener, app).await?)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}
