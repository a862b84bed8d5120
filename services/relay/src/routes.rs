//! HTTP surface of the relay
//!
//! Two API routes plus the operational pair (`/health`, `/metrics`). Every
//! error is converted to the JSON envelope `{error, details?|message?}` at
//! this boundary; nothing below it leaks raw errors into axum.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::Credentials;
use crate::metrics;
use link_resolver::Resolver;

/// Counters surfaced by `/health`
#[derive(Clone)]
pub struct RelayMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub resolver: Resolver,
    pub token_url: String,
    pub credentials: Arc<Credentials>,
    pub metrics: RelayMetrics,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// The concurrency limit guards the resolver routes in particular — each
/// resolution can hold outbound sockets open for the full deadline.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/api/spotify/token", get(token_handler))
        .route("/api/spotify/resolve", get(resolve_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// JSON response helper; every body on this surface goes through it.
fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// GET /api/spotify/token — one-shot client-credentials exchange.
///
/// Upstream rejections pass their status straight through with the raw body
/// as `details`; a 2xx grant without a token is this service's failure and
/// maps to 500.
async fn token_handler(State(state): State<AppState>) -> Response {
    let request_id = new_request_id();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    match spotify_auth::request_token(
        &state.http,
        &state.token_url,
        state.credentials.client_id.expose(),
        state.credentials.client_secret.expose(),
    )
    .await
    {
        Ok(grant) => {
            metrics::record_request("token", 200);
            json_response(
                StatusCode::OK,
                serde_json::json!({
                    "token": grant.access_token,
                    "expires_in": grant.expires_in,
                }),
            )
        }
        Err(spotify_auth::Error::TokenEndpoint { status, body }) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            warn!(request_id = %request_id, status, "token endpoint rejected the exchange");
            metrics::record_upstream_error("token_endpoint");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            metrics::record_request("token", status.as_u16());
            json_response(
                status,
                serde_json::json!({"error": "spotify_token_error", "details": body}),
            )
        }
        Err(spotify_auth::Error::MalformedResponse(body)) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            error!(request_id = %request_id, "token response carried no access token");
            metrics::record_upstream_error("malformed_token");
            metrics::record_request("token", 500);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": "no_access_token", "details": body}),
            )
        }
        Err(spotify_auth::Error::Http(message)) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            error!(request_id = %request_id, error = %message, "token exchange transport failure");
            metrics::record_upstream_error("token_transport");
            metrics::record_request("token", 500);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": "server_error"}),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResolveParams {
    url: Option<String>,
}

/// GET /api/spotify/resolve?url=… — chase the redirect chain.
///
/// Partial results (hop budget or deadline exhausted) are still 200s; the
/// `partial` flag is only present when set.
async fn resolve_handler(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Response {
    let request_id = new_request_id();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let Some(url) = params.url.filter(|u| !u.trim().is_empty()) else {
        metrics::record_request("resolve", 400);
        return json_response(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": "missing_url"}),
        );
    };

    match state.resolver.resolve(&url).await {
        Ok(resolution) => {
            info!(
                request_id = %request_id,
                hops = resolution.hops,
                partial = resolution.partial,
                resolved = %resolution.url,
                "resolved link"
            );
            metrics::record_resolve_hops(resolution.hops);
            metrics::record_request("resolve", 200);
            let body = if resolution.partial {
                serde_json::json!({"resolvedUrl": resolution.url, "partial": true})
            } else {
                serde_json::json!({"resolvedUrl": resolution.url})
            };
            json_response(StatusCode::OK, body)
        }
        Err(link_resolver::Error::EmptyInput) => {
            metrics::record_request("resolve", 400);
            json_response(
                StatusCode::BAD_REQUEST,
                serde_json::json!({"error": "missing_url"}),
            )
        }
        Err(link_resolver::Error::Transport(message)) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            error!(request_id = %request_id, error = %message, "resolution transport failure");
            metrics::record_upstream_error("resolve_transport");
            metrics::record_request("resolve", 500);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": "resolve_error", "message": message}),
            )
        }
    }
}

/// GET /health — liveness plus basic counters.
async fn health_handler(State(state): State<AppState>) -> Response {
    let uptime = state.metrics.started_at.elapsed().as_secs();
    let requests = state.metrics.requests_total.load(Ordering::Relaxed);
    let errors = state.metrics.errors_total.load(Ordering::Relaxed);

    json_response(
        StatusCode::OK,
        serde_json::json!({
            "status": "ok",
            "uptime_seconds": uptime,
            "requests_served": requests,
            "errors_total": errors,
        }),
    )
}

/// GET /metrics — Prometheus text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
        .into_response()
}
