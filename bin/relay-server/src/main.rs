//! relay-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the data file and env file, loading the API key.
//! 4. Migrate an API key left in the data file by older releases.
//! 5. Build the completion API client.
//! 6. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod entities;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod schemas;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::entities::{CredentialHolder, FileBackend, JsonStore};
use crate::handlers::SettingsService;
use crate::models::HttpCompletionClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: RELAY_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "relay-server starting");

    // ── 3. Persisted state ─────────────────────────────────────────────────────
    let store = JsonStore::new(Arc::new(FileBackend::new(&cfg.data_file)));
    let credentials = Arc::new(CredentialHolder::load(
        Arc::new(FileBackend::new(&cfg.env_file)),
        cfg.api_key_name.clone(),
        std::env::var(&cfg.api_key_name).ok(),
    ));
    info!(
        data_file = %cfg.data_file.display(),
        env_file = %cfg.env_file.display(),
        api_key_configured = credentials.is_configured(),
        "settings loaded"
    );

    // ── 4. Legacy key migration ────────────────────────────────────────────────
    let settings = SettingsService::new(store.clone(), credentials.clone());
    if let Err(e) = settings.migrate_legacy_key() {
        warn!(error = %e, "failed to migrate legacy apiKey; continuing");
    }

    // ── 5. Completion API client ───────────────────────────────────────────────
    let client = HttpCompletionClient::new(&cfg.upstream_url, cfg.upstream_timeout)?;
    info!(
        endpoint = %client.endpoint(),
        model = %cfg.model,
        timeout_secs = cfg.upstream_timeout.as_secs(),
        "completion client ready"
    );

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let state = Arc::new(AppState::new(cfg, store, credentials, Arc::new(client)));
    let app = routes::build(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("relay-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
