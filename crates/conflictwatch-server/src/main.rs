mod api;
mod hub;
mod messages;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use conflictwatch_analyzer::{Analyzer, HeuristicAnalyzer, HttpAnalyzer};
use conflictwatch_core::AppConfig;
use conflictwatch_store::EventStore;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    hub::BroadcastHub,
    middleware::AuthState,
    scheduler::{Monitor, MonitorSettings},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = conflictwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting conflictwatch server");

    let store = EventStore::new();
    if let Some(path) = &config.seed_path {
        let seed = conflictwatch_core::load_seed_file(path)
            .with_context(|| format!("loading seed file {}", path.display()))?;
        let summary = store.bulk_upsert(seed.events).await;
        tracing::info!(
            path = %path.display(),
            inserted = summary.inserted,
            updated = summary.updated,
            "seed file loaded"
        );
    }

    let hub = Arc::new(BroadcastHub::new(config.subscriber_buffer));
    let analyzer = build_analyzer(&config)?;
    let monitor = Arc::new(Monitor::new(
        store.clone(),
        Arc::clone(&hub),
        analyzer,
        MonitorSettings {
            interval: Duration::from_secs(config.monitor_interval_secs),
            analyzer_timeout: Duration::from_secs(config.analyzer_timeout_secs),
        },
    ));
    let job_scheduler = scheduler::build_scheduler(Arc::clone(&monitor)).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        conflictwatch_core::Environment::Development
    ))?;
    let state = AppState {
        store,
        hub,
        monitor: Arc::clone(&monitor),
        ws_send_timeout: Duration::from_secs(config.ws_send_timeout_secs),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler::shutdown(&monitor, job_scheduler).await;
    Ok(())
}

/// Remote analyzer when a URL is configured, otherwise the local heuristic one.
fn build_analyzer(config: &AppConfig) -> anyhow::Result<Arc<dyn Analyzer>> {
    let analyzer: Arc<dyn Analyzer> = match &config.analyzer_url {
        Some(url) => Arc::new(
            HttpAnalyzer::new(
                url,
                config.analyzer_api_key.clone(),
                Duration::from_secs(config.analyzer_timeout_secs),
            )
            .context("building analyzer HTTP client")?,
        ),
        None => Arc::new(HeuristicAnalyzer::new()),
    };
    tracing::info!(analyzer = analyzer.name(), "analyzer configured");
    Ok(analyzer)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
