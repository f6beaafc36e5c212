//! Gateway construction and background maintenance.

use aegis_core::ModelTier;
use aegis_providers::MockBackend;
use aegis_routing::{BackendRegistry, Gateway, GatewayConfig, ResponseCache};
use anyhow::{Context as _, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Loads `path`, or the user configuration when no path is given.
///
/// A user configuration that cannot be read falls back to defaults; an
/// explicit path must load.
///
/// # Errors
/// Returns an error if an explicitly named file is missing or invalid.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    if let Some(path) = path {
        return GatewayConfig::load_from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    Ok(GatewayConfig::load_or_create().unwrap_or_else(|error| {
        tracing::warn!("Failed to load config from ~/.aegis/config.toml: {error}");
        tracing::warn!("Using default configuration");
        GatewayConfig::default()
    }))
}

/// Gateway over HTTP backends, or over mock backends when `mock` is set.
///
/// # Errors
/// Returns an error if the configuration is invalid or an HTTP client cannot be built.
pub fn build_gateway(config: GatewayConfig, mock: bool) -> Result<Gateway> {
    if mock {
        return mock_gateway(config);
    }

    let gateway = Gateway::from_config(config).context("failed to build gateway")?;
    let missing: Vec<&str> = ModelTier::ALL
        .into_iter()
        .filter(|tier| gateway.registry().get(*tier).is_none())
        .map(ModelTier::as_str)
        .collect();
    if !missing.is_empty() {
        tracing::warn!(
            tiers = ?missing,
            "No backend configured for some tiers; requests will fall back or fail"
        );
    }
    Ok(gateway)
}

/// Gateway whose tiers and reasoning backend answer in-process.
///
/// # Errors
/// Returns an error if the configuration is invalid.
pub fn mock_gateway(config: GatewayConfig) -> Result<Gateway> {
    let mut registry = BackendRegistry::new();
    for (tier, cost, latency_ms) in [
        (ModelTier::Small, 0.000_1, 120),
        (ModelTier::Medium, 0.001, 450),
        (ModelTier::Large, 0.01, 1_200),
    ] {
        let backend = MockBackend::new(format!("mock-{tier}"))
            .with_cost(cost)
            .with_latency_ms(latency_ms);
        registry.register(tier, Arc::new(backend));
    }

    let reasoning = MockBackend::new("mock-reasoning").with_default_response("0.5");
    Ok(Gateway::new(config, registry)
        .context("failed to build mock gateway")?
        .with_reasoning_backend(Arc::new(reasoning)))
}

/// Periodically drops expired cache entries until `shutdown` is cancelled.
pub fn spawn_cache_sweeper(
    cache: Arc<ResponseCache>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cache.evict_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = cache.len(), "swept expired cache entries");
                    }
                }
            }
        }
    })
}
