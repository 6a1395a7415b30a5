//! X OAuth Gateway
//!
//! Single-binary Rust service that:
//! 1. Runs the OAuth 2.0 Authorization Code + PKCE flow against X
//! 2. Keeps sessions and the resulting tokens in a key-value store
//! 3. Exposes post lookup and publishing with the stored access token

mod config;
mod error;
mod flow;
mod handlers;
mod metrics;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use kv_store::{FileStore, KvStore, MemoryStore};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x_oauth::{OAuthClient, XApi};

use crate::config::{Config, StoreBackend, StoreConfig};
use crate::flow::Orchestrator;
use crate::handlers::{AppState, build_router};

/// Graceful shutdown deadline once a signal has been received
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

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

    info!("starting x-oauth-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder().context("failed to install metrics recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        client_id = %config.x.client_id,
        redirect_uri = %config.x.redirect_uri,
        api_base = %config.x.api_base,
        client_auth = ?config.x.client_auth,
        store = ?config.store.backend,
        "configuration loaded"
    );

    let store = open_store(&config.store).await?;

    let http = reqwest::Client::new();
    let settings = config
        .oauth_settings()
        .context("client secret was not resolved")?;
    let oauth = OAuthClient::new(http.clone(), settings).context("invalid OAuth endpoints")?;
    let api = XApi::new(http, &config.x.api_base, config.timeout()).context("invalid api_base")?;

    let state = AppState {
        flow: Arc::new(Orchestrator::new(store, oauth, config.session_ttl())),
        api,
        prometheus,
    };
    let app = build_router(state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain deadline starts when the signal fires, not at startup
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
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Open the configured store backend.
async fn open_store(store: &StoreConfig) -> Result<Arc<dyn KvStore>> {
    match store.backend {
        StoreBackend::Memory => {
            warn!("memory store selected, sessions and tokens are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::File => {
            let path = store
                .path
                .as_deref()
                .context("store.path is required for the file backend")?;
            open_file_store(path).await
        }
    }
}

async fn open_file_store(path: &Path) -> Result<Arc<dyn KvStore>> {
    let store = FileStore::open(path.to_path_buf())
        .await
        .with_context(|| format!("failed to open store file {}", path.display()))?;
    info!(path = %store.path().display(), "file store opened");
    Ok(Arc::new(store))
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
