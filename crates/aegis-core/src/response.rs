use crate::ModelTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Which tier served a request and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected tier.
    pub tier: ModelTier,
    /// Backend identifier the tier maps to.
    pub model: String,
    /// Human-readable rationale naming the deciding factor.
    pub reason: String,
    /// Confidence in the decision, in `[0, 1]`.
    pub confidence: f64,
    /// Whether the response was served from the cache.
    pub cache_hit: bool,
}

/// Result of checking a response for unsupported claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalAnalysis {
    /// Aggregate probability that the response contains an unsupported claim.
    pub confidence: f64,
    /// Chain of unsupported causal claims, when one was found.
    pub pathway: Option<String>,
    /// Whether the response is flagged.
    pub is_hallucination: bool,
    /// Short justification referencing the deciding claim.
    pub explanation: String,
}

/// The result returned to a caller for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Generated (or cached) text.
    pub response: String,
    /// Backend identifier that produced the text.
    pub model_used: String,
    /// Cost of this request in USD.
    pub cost: f64,
    /// End-to-end latency in milliseconds.
    pub latency_ms: u64,
    /// How the request was routed.
    pub routing_decision: RoutingDecision,
    /// Hallucination check, when one was performed or re-attached from cache.
    pub causal_analysis: Option<CausalAnalysis>,
    /// Unique request identifier.
    pub request_id: Uuid,
}

/// Process-wide statistics for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Completed requests.
    pub total_requests: u64,
    /// Cache hits as a percentage of completed requests.
    pub cache_hit_rate: f64,
    /// USD saved compared with serving every request on the large tier.
    pub cost_savings: f64,
    /// Mean end-to-end latency.
    pub avg_latency_ms: u64,
    /// Responses flagged as hallucinated.
    pub hallucinations_caught: u64,
    /// Completed requests per backend identifier.
    pub model_distribution: BTreeMap<String, u64>,
    /// USD actually spent.
    pub total_cost: f64,
    /// Causal analyses that failed and were skipped.
    pub analysis_failures: u64,
}
