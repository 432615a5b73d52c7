//! sqlgen-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON when `SQLGEN_LOG_JSON` is set).
//! 3. Compile the HTML views.
//! 4. Wire the SQL Server backend and generation client into the pipeline.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.
//!
//! No database connection is opened at startup; each request opens and
//! closes its own.

mod config;
mod error;
mod middleware;
mod routes;
mod state;
mod views;

use std::net::SocketAddr;
use std::sync::Arc;

use sqlgen_core::{MssqlDatabase, Pipeline, QueryGenerator};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

use crate::config::Config;
use crate::state::AppState;
use crate::views::Views;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);

    info!(version = env!("CARGO_PKG_VERSION"), "sqlgen-server starting");

    // ── 3. Views ───────────────────────────────────────────────────────────────
    let views = Views::new()?;

    // ── 4. Pipeline ────────────────────────────────────────────────────────────
    info!(
        generator = %cfg.generator.base_url,
        model = %cfg.generator.model,
        db_server = %cfg.database.server,
        database = %cfg.database.database,
        namespace = %cfg.database.schema,
        "pipeline configured"
    );
    let pipeline = Pipeline::new(
        MssqlDatabase::new(cfg.database.clone()),
        QueryGenerator::new(cfg.generator.clone()),
    );

    let state = Arc::new(AppState::new(cfg.clone(), pipeline, views));

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(state);
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("sqlgen-server stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `SQLGEN_LOG`.
fn init_tracing(cfg: &Config) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, rejected) = log_filter(rust_log.as_deref(), &cfg.log_level);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Some(err) = rejected {
        warn!(directive = %cfg.log_level, error = %err, "invalid SQLGEN_LOG, using `info`");
    }
}

/// Pick the log filter from `RUST_LOG`, else the configured level, else `info`.
///
/// The parse error of an unusable configured level is handed back so it can
/// be logged once the subscriber exists.
fn log_filter(rust_log: Option<&str>, configured: &str) -> (EnvFilter, Option<ParseError>) {
    if let Some(filter) = rust_log.and_then(|v| v.parse::<EnvFilter>().ok()) {
        return (filter, None);
    }
    match configured.parse::<EnvFilter>() {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new("info"), Some(e)),
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    let received = tokio::select! {
        r = tokio::signal::ctrl_c() => r.map(|()| "ctrl-c"),
        r = terminate() => r.map(|()| "terminate"),
    };
    match received {
        Ok(signal) => info!(signal, "draining in-flight requests"),
        Err(e) => warn!(error = %e, "signal listener failed; shutting down"),
    }
}

#[cfg(unix)]
async fn terminate() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> std::io::Result<()> {
    std::future::pending().await
}
