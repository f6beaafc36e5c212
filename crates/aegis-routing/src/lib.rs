//! Cost-aware routing for LLM requests.
//!
//! A [`Gateway`] scores each prompt with a [`ComplexityClassifier`], serves
//! repeats from a [`ResponseCache`], sends the rest to the cheapest adequate
//! tier through a [`TierRouter`], optionally checks the answer with a
//! [`CausalAnalyzer`], and records everything in a [`MetricsAggregator`].

pub mod analyzer;
pub mod cache;
pub mod causal;
pub mod config;
/// Gateway error taxonomy
pub mod error;
/// Request orchestration
pub mod gateway;
pub mod metrics;
pub mod router;

pub use analyzer::{ComplexityClassifier, ComplexityScore, ComplexitySignals, ComplexityTier};
pub use cache::{CacheEntry, CacheKey, CacheStats, ResponseCache};
pub use causal::{CausalAnalyzer, Claim};
pub use config::{
    AnalysisConfig, BackendConfig, BackendsConfig, CacheConfig, ClassifierConfig,
    ComplexityThresholds, GatewayConfig, RoutingConfig, ServerConfig, SignalWeights,
};
pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use metrics::{MetricsAggregator, RequestOutcome, format_report};
pub use router::{BackendRegistry, Dispatch, Routed, TierPolicy, TierRouter};
