//! Aegis gateway server

use aegis_routing::format_report;
use aegis_server::{Cli, build_gateway, load_config, router, spawn_cache_sweeper};
use anyhow::{Context as _, Result};
use clap::Parser as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    Registry::default()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aegis=info,aegis_server=info,aegis_routing=info".into()),
        )
        .with(fmt::layer().with_target(true).with_level(true))
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    let bind = config.server.bind.clone();
    let sweep_every = Duration::from_secs(config.cache.sweep_interval_secs.max(1));

    let gateway = build_gateway(config, cli.mock)?;
    let shutdown = CancellationToken::new();
    let sweeper = spawn_cache_sweeper(Arc::clone(gateway.cache()), sweep_every, shutdown.clone());

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(%bind, mock = cli.mock, "Aegis gateway listening");

    axum::serve(listener, router(gateway.clone()))
        .with_graceful_shutdown(async {
            if let Err(error) = signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {error}");
            }
            tracing::info!("Shutting down");
        })
        .await
        .context("server failed")?;

    shutdown.cancel();
    if let Err(error) = sweeper.await {
        tracing::warn!("Cache sweeper ended abnormally: {error}");
    }

    match format_report(&gateway.stats()) {
        Ok(report) => tracing::info!("Session statistics\n{report}"),
        Err(error) => tracing::warn!("Failed to format statistics: {error}"),
    }
    Ok(())
}
