//! Common test utilities and helpers for aegis-routing tests
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use aegis_core::ModelTier;
use aegis_providers::MockBackend;
use aegis_routing::{BackendRegistry, Gateway, GatewayConfig};
use std::env;
use std::sync::{Arc, Once};
use tracing_subscriber::{EnvFilter, fmt};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests (idempotent).
/// Honors `RUST_LOG` if set, otherwise defaults to "debug".
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_owned());
        if fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .try_init()
            .is_err()
        {
            // tracing already initialized in this process
        }
    });
}

/// Mock backends for every tier plus the reasoning backend.
pub struct MockTiers {
    /// Small tier mock.
    pub small: MockBackend,
    /// Medium tier mock.
    pub medium: MockBackend,
    /// Large tier mock.
    pub large: MockBackend,
    /// Reasoning backend mock.
    pub reasoning: MockBackend,
}

impl MockTiers {
    /// Tier mocks that answer with their own name and charge tier-like prices.
    pub fn new() -> Self {
        Self {
            small: MockBackend::new("small")
                .with_default_response("small tier answer")
                .with_cost(0.000_1),
            medium: MockBackend::new("medium")
                .with_default_response("medium tier answer")
                .with_cost(0.001),
            large: MockBackend::new("large")
                .with_default_response("large tier answer")
                .with_cost(0.01),
            reasoning: MockBackend::new("reasoning").with_default_response("0.1"),
        }
    }

    /// Registry holding clones of the tier mocks.
    pub fn registry(&self) -> BackendRegistry {
        BackendRegistry::new()
            .with_backend(ModelTier::Small, Arc::new(self.small.clone()))
            .with_backend(ModelTier::Medium, Arc::new(self.medium.clone()))
            .with_backend(ModelTier::Large, Arc::new(self.large.clone()))
    }

    /// Gateway over these mocks.
    pub fn gateway(&self, config: GatewayConfig) -> Gateway {
        init_tracing();
        Gateway::new(config, self.registry())
            .expect("test config is valid")
            .with_reasoning_backend(Arc::new(self.reasoning.clone()))
    }

    /// Total calls made to the tier backends.
    pub fn tier_calls(&self) -> usize {
        self.small.call_count() + self.medium.call_count() + self.large.call_count()
    }
}

/// A prompt the classifier scores as complex.
pub const COMPLEX_PROMPT: &str = "Design a distributed consensus algorithm step by step, prove \
    its safety, and implement it in Rust:\n\
    1. Explain why leader election is needed\n\
    2. Compare it with Paxos\n\
    3. Analyze the security implications";

/// Context accompanying [`COMPLEX_PROMPT`].
pub const COMPLEX_CONTEXT: &str = "The cluster runs across three regions with unreliable links.";
