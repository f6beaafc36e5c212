//! Lock-free aggregation of per-request outcomes.

use aegis_core::{AggregateStats, IgnoreRwLock as _, ModelTier};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Nano-dollars per USD; costs are accumulated as integers.
const NANOS_PER_USD: f64 = 1e9;

/// What a completed request contributes to the statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestOutcome {
    /// Tier that produced the response
    pub tier: ModelTier,
    /// USD actually charged
    pub cost: f64,
    /// USD the large tier would have charged
    pub baseline_cost: f64,
    /// End-to-end latency
    pub latency_ms: u64,
    /// Whether the cache served the request
    pub cache_hit: bool,
    /// Whether analysis flagged the response
    pub hallucination: bool,
    /// Whether analysis was attempted and failed
    pub analysis_failed: bool,
}

fn to_nanos(usd: f64) -> u64 {
    if usd.is_finite() && usd > 0.0 {
        (usd * NANOS_PER_USD).round() as u64
    } else {
        0
    }
}

fn to_usd(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_USD
}

/// Process-wide counters shared by every request handler.
///
/// The cache hit rate is measured against lookups: every completed request
/// plus every request whose backends all failed after a cache miss.
///
/// Recording only takes a shared gate, so concurrent requests never block
/// one another. Snapshots and resets take the gate exclusively, which makes
/// each snapshot reflect a whole number of requests.
pub struct MetricsAggregator {
    gate: RwLock<()>,
    models: [String; 3],
    total_requests: AtomicU64,
    lookups: AtomicU64,
    cache_hits: AtomicU64,
    hallucinations: AtomicU64,
    analysis_failures: AtomicU64,
    latency_sum_ms: AtomicU64,
    cost_nanos: AtomicU64,
    baseline_nanos: AtomicU64,
    per_tier: [AtomicU64; 3],
}

impl MetricsAggregator {
    /// Creates an aggregator reporting tiers under the given model identifiers.
    pub fn new(models: [String; 3]) -> Self {
        Self {
            gate: RwLock::new(()),
            models,
            total_requests: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            hallucinations: AtomicU64::new(0),
            analysis_failures: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            cost_nanos: AtomicU64::new(0),
            baseline_nanos: AtomicU64::new(0),
            per_tier: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
        }
    }

    /// Record one completed request.
    pub fn record(&self, outcome: &RequestOutcome) {
        let _gate = self.gate.read_ignore_poison();

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.per_tier[outcome.tier.index()].fetch_add(1, Ordering::Relaxed);
        if outcome.cache_hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.hallucination {
            self.hallucinations.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.analysis_failed {
            self.analysis_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_ms
            .fetch_add(outcome.latency_ms, Ordering::Relaxed);
        self.cost_nanos
            .fetch_add(to_nanos(outcome.cost), Ordering::Relaxed);
        self.baseline_nanos
            .fetch_add(to_nanos(outcome.baseline_cost), Ordering::Relaxed);
    }

    /// Record a cache miss that produced no response.
    pub fn record_failed_lookup(&self) {
        let _gate = self.gate.read_ignore_poison();
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent view of everything recorded so far.
    pub fn snapshot(&self) -> AggregateStats {
        let _gate = self.gate.write_ignore_poison();

        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let lookups = self.lookups.load(Ordering::Relaxed);

        let mut model_distribution = BTreeMap::new();
        for tier in ModelTier::ALL {
            let count = self.per_tier[tier.index()].load(Ordering::Relaxed);
            *model_distribution
                .entry(self.models[tier.index()].clone())
                .or_insert(0) += count;
        }

        let cost_nanos = self.cost_nanos.load(Ordering::Relaxed);
        let baseline_nanos = self.baseline_nanos.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);

        AggregateStats {
            total_requests,
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                cache_hits as f64 / lookups as f64 * 100.0
            },
            cost_savings: to_usd(baseline_nanos.saturating_sub(cost_nanos)),
            avg_latency_ms: self
                .latency_sum_ms
                .load(Ordering::Relaxed)
                .checked_div(total_requests)
                .unwrap_or(0),
            hallucinations_caught: self.hallucinations.load(Ordering::Relaxed),
            model_distribution,
            total_cost: to_usd(cost_nanos),
            analysis_failures: self.analysis_failures.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        let _gate = self.gate.write_ignore_poison();
        for counter in [
            &self.total_requests,
            &self.lookups,
            &self.cache_hits,
            &self.hallucinations,
            &self.analysis_failures,
            &self.latency_sum_ms,
            &self.cost_nanos,
            &self.baseline_nanos,
        ]
        .into_iter()
        .chain(&self.per_tier)
        {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
