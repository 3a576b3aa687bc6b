//! HTTP server for the queue API, health checks and Prometheus metrics
//!
//! Public endpoints serve the display frame and monitoring data. Queue
//! mutations require an operator bearer token obtained from `/api/auth/login`.

use crate::auth::Session;
use crate::config::ServiceSettings;
use crate::metrics::encode_metrics;
use crate::service::app::AppState;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::sync::DisplayFrame;
use crate::types::MutationOutcome;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl From<&ServiceSettings> for HttpServerConfig {
    fn from(settings: &ServiceSettings) -> Self {
        Self {
            port: settings.http_port,
            host: settings.host.clone(),
        }
    }
}

/// HTTP server exposing the queue API and monitoring endpoints
pub struct HttpServer {
    config: HttpServerConfig,
    app_state: Arc<AppState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl HttpServer {
    /// Create a new server for `app_state`
    pub fn new(config: HttpServerConfig, app_state: Arc<AppState>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            app_state,
            shutdown_tx,
        }
    }

    /// Bind and serve until `stop` is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid HTTP server address")?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;
        info!("HTTP server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, create_router(self.app_state.clone()))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Stop the server
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping HTTP server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }

        Ok(())
    }
}

/// Build the router with all endpoints
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .route("/api/queue", get(queue_handler).put(set_handler))
        .route("/api/queue/refresh", post(refresh_handler))
        .route("/api/queue/increment", post(increment_handler))
        .route("/api/queue/decrement", post(decrement_handler))
        .route("/api/queue/reset", post(reset_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/session", get(session_handler))
        .route("/api/auth/logout", post(logout_handler))
        .with_state(app_state)
}

/// Errors returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Busy,
    Upstream(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason),
            ApiError::Busy => (
                StatusCode::CONFLICT,
                "Another queue update is in progress".to_string(),
            ),
            ApiError::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetQueueRequest {
    pub queue_number: i64,
}

/// Body of a successful or rejected mutation
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    #[serde(flatten)]
    pub outcome: MutationOutcome,
    pub frame: DisplayFrame,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    state
        .authenticator()
        .get_session(token)
        .await
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?
        .ok_or_else(|| ApiError::Unauthorized("Session expired or unknown".to_string()))
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": state.config().service.name,
        "version": crate::VERSION,
        "endpoints": [
            "/health",
            "/ready",
            "/alive",
            "/metrics",
            "/stats",
            "/api/queue",
            "/api/auth/login"
        ]
    }))
}

/// Lightweight health check endpoint handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");

    let status = HealthCheck::liveness_check(state.clone())
        .await
        .unwrap_or(HealthStatus::Unhealthy);
    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": state.config().service.name,
            "version": crate::VERSION
        })),
    )
}

/// Readiness check endpoint handler
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Readiness check requested");

    match HealthCheck::readiness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Ready"),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, "Degraded but ready"),
        Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
        }
    }
}

/// Liveness check endpoint handler
async fn alive_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Liveness check requested");

    match HealthCheck::liveness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Alive"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    debug!("Metrics endpoint requested");

    match encode_metrics(&state.metrics()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

/// Detailed service statistics endpoint handler
async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Stats endpoint requested");

    match HealthCheck::check(state.clone()).await {
        Ok(health) => {
            let stats = json!({
                "service": {
                    "name": health.service,
                    "version": health.version,
                    "status": health.status,
                    "uptime": health.stats.uptime_info
                },
                "queue": {
                    "number": health.stats.queue_number,
                    "estimate": health.stats.estimate,
                    "last_updated": health.stats.last_updated
                },
                "store": health.stats.store_backend,
                "components": health.checks,
                "timestamp": chrono::Utc::now()
            });

            (StatusCode::OK, Json(stats))
        }
        Err(e) => {
            error!("Failed to get stats: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Failed to get service stats",
                    "timestamp": chrono::Utc::now()
                })),
            )
        }
    }
}

/// Current display frame for viewers
async fn queue_handler(State(state): State<Arc<AppState>>) -> Json<DisplayFrame> {
    Json(state.display_frame().await)
}

/// Manual retry after a failed fetch
async fn refresh_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DisplayFrame>, ApiError> {
    let viewer = state.viewer();
    viewer
        .refresh()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Json(state.render_frame(&viewer).await))
}

async fn increment_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MutationResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    debug!("Increment requested by {}", session.email);
    respond(&state, state.operator().increment().await).await
}

async fn decrement_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MutationResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    debug!("Decrement requested by {}", session.email);
    respond(&state, state.operator().decrement().await).await
}

async fn reset_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MutationResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    debug!("Reset requested by {}", session.email);
    respond(&state, state.operator().reset().await).await
}

async fn set_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SetQueueRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let session = require_session(&state, &headers).await?;
    debug!(
        "Set to {} requested by {}",
        request.queue_number, session.email
    );
    respond(&state, state.operator().mutate(request.queue_number).await).await
}

async fn respond(
    state: &AppState,
    result: crate::error::Result<MutationOutcome>,
) -> Result<Json<MutationResponse>, ApiError> {
    let outcome = result.map_err(|e| ApiError::Upstream(e.to_string()))?;
    if matches!(outcome, MutationOutcome::Busy) {
        return Err(ApiError::Busy);
    }

    Ok(Json(MutationResponse {
        outcome,
        frame: state.render_frame(&state.operator()).await,
    }))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .authenticator()
        .sign_in_with_password(&request.email, &request.password)
        .await
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;

    state.metrics().record_auth_attempt(session.is_some());
    session
        .map(Json)
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))
}

async fn session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Session>, ApiError> {
    require_session(&state, &headers).await.map(Json)
}

async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    state
        .authenticator()
        .sign_out(token)
        .await
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;
    Ok(StatusCode::NO_CONTENT)
}
