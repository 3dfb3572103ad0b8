//! HTTP gateway for FileChat.
//!
//! Serves the embedded chat frontend and the per-session JSON/SSE API.
//! Sessions live in memory only and are dropped on restart.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use filechat_agent::TurnRunner;
use filechat_config::AppConfig;
use filechat_core::session::SessionState;

/// One registered session.
pub struct SessionSlot {
    /// Used to pick the eviction victim without locking the session
    pub created_at: DateTime<Utc>,
    pub session: Arc<Mutex<SessionState>>,
}

impl SessionSlot {
    pub fn new(session: SessionState) -> Self {
        Self {
            created_at: session.created_at,
            session: Arc::new(Mutex::new(session)),
        }
    }
}

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub runner: Arc<TurnRunner>,
    pub sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl GatewayState {
    pub fn new(config: AppConfig, runner: TurnRunner) -> Self {
        Self {
            config,
            runner: Arc::new(runner),
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router: frontend, health, and the session API.
///
/// Layers applied:
/// - Request body limit from `gateway.max_upload_bytes`
/// - CORS restricted to the gateway's own origin
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.gateway.max_upload_bytes;
    let origin = format!(
        "http://{}:{}",
        state.config.gateway.host, state.config.gateway.port
    );

    let router = Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/api", api::api_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(body_limit));

    let router = match origin.parse::<HeaderValue>() {
        Ok(origin) => router.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE])
                .max_age(std::time::Duration::from_secs(3600)),
        ),
        Err(_) => {
            warn!(origin = %origin, "Gateway origin is not a valid header value, CORS disabled");
            router
        }
    };

    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if !config.has_api_key() {
        warn!("No API key configured; every chat turn will store an authentication error");
    }

    let provider = filechat_providers::build_from_config(&config)?;
    let runner = TurnRunner::from_config(provider, &config);
    let state = Arc::new(GatewayState::new(config, runner));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub model: String,
    pub sessions: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        provider: state.runner.provider_name().into(),
        model: state.runner.model().into(),
        sessions: state.sessions.read().await.len(),
    })
}
