//! Registry mapping tiers to backend instances.
//!
//! Backends are created once at startup and shared by every request.

use crate::config::{BackendConfig, BackendsConfig};
use crate::error::Result;
use aegis_core::{ModelBackend, ModelTier};
use aegis_providers::{OpenAiCompatibleBackend, TokenPricing};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Registry that maps tiers to their backend instances.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    /// Map from tier to backend instance
    backends: HashMap<ModelTier, Arc<dyn ModelBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create HTTP backends for every tier in `config`.
    ///
    /// A tier whose API key variable is set but empty or missing is left
    /// unregistered and will be skipped by fallback.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(config: &BackendsConfig, timeout: Duration) -> Result<Self> {
        let mut registry = Self::new();
        for tier in ModelTier::ALL {
            if let Some(backend) = http_backend(config.for_tier(tier), timeout)? {
                registry.register(tier, Arc::new(backend));
            }
        }
        Ok(registry)
    }

    /// Register `backend` for `tier`, replacing any previous one.
    pub fn register(&mut self, tier: ModelTier, backend: Arc<dyn ModelBackend>) {
        self.backends.insert(tier, backend);
    }

    /// Builder-style [`Self::register`].
    #[must_use]
    pub fn with_backend(mut self, tier: ModelTier, backend: Arc<dyn ModelBackend>) -> Self {
        self.register(tier, backend);
        self
    }

    /// Get the backend registered for `tier`.
    pub fn get(&self, tier: ModelTier) -> Option<Arc<dyn ModelBackend>> {
        self.backends.get(&tier).map(Arc::clone)
    }

    /// Whether `tier` has a backend that currently accepts requests.
    pub async fn is_available(&self, tier: ModelTier) -> bool {
        match self.backends.get(&tier) {
            Some(backend) => backend.is_available().await,
            None => false,
        }
    }

    /// Tiers with a registered backend, cheapest first.
    pub fn registered_tiers(&self) -> Vec<ModelTier> {
        ModelTier::ALL
            .into_iter()
            .filter(|tier| self.backends.contains_key(tier))
            .collect()
    }
}

/// Builds the HTTP backend described by `config`.
///
/// Returns `Ok(None)` when the backend needs an API key that is not set.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub fn http_backend(
    config: &BackendConfig,
    timeout: Duration,
) -> Result<Option<OpenAiCompatibleBackend>> {
    let api_key = config.api_key();
    if config.api_key_env.is_some() && api_key.is_none() {
        tracing::warn!(
            model = %config.model,
            variable = config.api_key_env.as_deref().unwrap_or_default(),
            "API key not set, backend disabled"
        );
        return Ok(None);
    }

    let mut backend = OpenAiCompatibleBackend::new(&config.endpoint, &config.model)
        .with_pricing(TokenPricing {
            input_per_1k: config.input_cost_per_1k,
            output_per_1k: config.output_cost_per_1k,
        })
        .with_timeout(timeout)?;
    if let Some(api_key) = api_key {
        backend = backend.with_api_key(api_key);
    }
    Ok(Some(backend))
}
