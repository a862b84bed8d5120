//! Spotify Link Relay
//!
//! Single-binary Rust service that:
//! 1. Exchanges its client credentials for Spotify access tokens on demand
//! 2. Resolves Spotify short/deep links to canonical open.spotify.com URLs
//!    by following redirects manually, with HTML fallback cues

mod config;
mod metrics;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use link_resolver::Resolver;

use crate::config::{Config, Credentials};
use crate::routes::{AppState, RelayMetrics, build_router};

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting spotify-link-relay");

    // Install the Prometheus recorder before any metrics are emitted
    let prometheus = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config = match Config::resolve_path(cli_config_path) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Config::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => {
            info!("no config file, using defaults");
            Config::from_defaults().context("failed to build default configuration")?
        }
    };
    config.validate().context("invalid configuration")?;

    // Fail fast: without the credential pair there is nothing to serve
    let credentials = Credentials::from_env().context(
        "missing Spotify credentials — set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET",
    )?;

    info!(
        listen_addr = %config.server.listen_addr,
        token_url = %config.spotify.token_url,
        hop_timeout_secs = config.resolver.hop_timeout_secs,
        deadline_secs = config.resolver.deadline_secs,
        "configuration loaded"
    );

    let resolver = Resolver::new(
        Duration::from_secs(config.resolver.hop_timeout_secs),
        Duration::from_secs(config.resolver.deadline_secs),
    )
    .context("failed to build resolver HTTP client")?;

    let state = AppState {
        http: reqwest::Client::new(),
        resolver,
        token_url: config.spotify.token_url.clone(),
        credentials: Arc::new(credentials),
        metrics: RelayMetrics::new(),
        prometheus,
    };

    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "accepting requests");

    // Graceful shutdown:
    // 1. shutdown_signal() fires on SIGTERM/SIGINT
    // 2. axum stops accepting new connections and drains in-flight requests
    // 3. DRAIN_TIMEOUT caps the drain so a slow resolution cannot block exit
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;

    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
