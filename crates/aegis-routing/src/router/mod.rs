//! Tier selection, dispatch, and fallback.
//!
//! [`TierRouter::route`] consults the cache first and only classifies on a
//! miss. [`TierRouter::dispatch`] invokes the selected backend under a global
//! concurrency limit and a per-call deadline, retrying once on the next
//! cheaper available tier when the selected backend is unavailable.

/// Tier to backend registry
pub mod backends;
/// Complexity to tier policy
pub mod policy;

pub use backends::{BackendRegistry, http_backend};
pub use policy::TierPolicy;

use crate::analyzer::{ComplexityClassifier, ComplexityScore};
use crate::cache::{CacheEntry, CacheKey, ResponseCache};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use aegis_core::{
    BackendReply, Error as CoreError, Invocation, ModelTier, PromptRequest, RoutingDecision,
};
use std::result::Result as StdResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Confidence reported when a response is served from the cache.
const CACHE_HIT_CONFIDENCE: f64 = 1.0;

/// Outcome of routing a request.
#[derive(Debug, Clone)]
pub enum Routed {
    /// A fresh cached response exists.
    Cached {
        /// Cache key of the request
        key: CacheKey,
        /// The cached response
        entry: CacheEntry,
        /// Decision describing the cache hit
        decision: RoutingDecision,
    },
    /// The request must be generated.
    Fresh {
        /// Cache key of the request
        key: CacheKey,
        /// Classifier output
        complexity: ComplexityScore,
        /// Selected tier before any fallback
        decision: RoutingDecision,
    },
}

/// A generated response and the decision that produced it.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Final decision, amended if a fallback tier served the request
    pub decision: RoutingDecision,
    /// Backend reply
    pub reply: BackendReply,
}

/// Why a single tier could not serve a call.
enum TierFailure {
    Unavailable(String),
    Timeout(u64),
    Failed(CoreError),
    Internal(String),
}

/// Routes requests to tiers and invokes their backends.
pub struct TierRouter {
    policy: TierPolicy,
    models: [String; 3],
    registry: BackendRegistry,
    backend_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl TierRouter {
    /// Creates a router over `registry` using the routing and backend settings of `config`.
    pub fn new(config: &GatewayConfig, registry: BackendRegistry) -> Self {
        Self {
            policy: TierPolicy::new(config.classifier.thresholds, &config.routing),
            models: ModelTier::ALL.map(|tier| config.backends.model_id(tier).to_owned()),
            registry,
            backend_timeout: Duration::from_millis(config.routing.backend_timeout_ms),
            permits: Arc::new(Semaphore::new(config.routing.max_concurrent_calls)),
        }
    }

    /// Backend identifier configured for `tier`.
    pub fn model_id(&self, tier: ModelTier) -> &str {
        &self.models[tier.index()]
    }

    /// The registry backing this router.
    pub const fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Route a validated request: serve from cache when possible, otherwise pick a tier.
    pub fn route(
        &self,
        request: &PromptRequest,
        cache: &ResponseCache,
        classifier: &ComplexityClassifier,
    ) -> Routed {
        let key = cache.key_for(request);

        if let Some(entry) = cache.lookup(&key) {
            let decision = RoutingDecision {
                tier: entry.tier,
                model: entry.model.clone(),
                reason: format!(
                    "cache hit for fingerprint {}, originally served by {} tier",
                    key.as_str().get(..12).unwrap_or_default(),
                    entry.tier
                ),
                confidence: CACHE_HIT_CONFIDENCE,
                cache_hit: true,
            };
            tracing::debug!(key = %key, model = %entry.model, "serving from cache");
            return Routed::Cached {
                key,
                entry,
                decision,
            };
        }

        let complexity = classifier.classify(request);
        let decision = self.decide(&complexity);
        Routed::Fresh {
            key,
            complexity,
            decision,
        }
    }

    /// Decision for a classified request, before availability is considered.
    pub fn decide(&self, complexity: &ComplexityScore) -> RoutingDecision {
        let tier = self.policy.tier_for(complexity.tier);
        let decision = RoutingDecision {
            tier,
            model: self.model_id(tier).to_owned(),
            reason: self.policy.reason(complexity, tier),
            confidence: self.policy.confidence(complexity.score),
            cache_hit: false,
        };

        tracing::info!(
            "Routing decision: {} | Complexity: {} ({:.2}) | Confidence: {:.2}",
            decision.model,
            complexity.tier,
            complexity.score,
            decision.confidence
        );

        decision
    }

    /// Invoke the backend chosen by `decision`, falling back once to a cheaper tier.
    ///
    /// # Errors
    /// Returns [`GatewayError::BackendUnavailable`] when neither the selected tier nor
    /// its fallback can serve, [`GatewayError::BackendTimeout`] when the serving backend
    /// misses its deadline, and [`GatewayError::Backend`] for unusable replies.
    pub async fn dispatch(
        &self,
        mut decision: RoutingDecision,
        request: &PromptRequest,
    ) -> Result<Dispatch> {
        let primary = decision.tier;
        let primary_reason = match self.invoke_tier(primary, request).await {
            Ok(reply) => return Ok(Dispatch { decision, reply }),
            Err(TierFailure::Unavailable(reason)) => reason,
            Err(failure) => return Err(Self::into_error(primary, failure)),
        };

        tracing::warn!(tier = %primary, reason = %primary_reason, "backend unavailable, looking for fallback");

        let Some(fallback) = self.next_available(primary).await else {
            return Err(GatewayError::BackendUnavailable {
                tier: primary,
                reason: format!("{primary_reason}; no cheaper tier available"),
            });
        };

        match self.invoke_tier(fallback, request).await {
            Ok(reply) => {
                decision.reason = format!(
                    "{}; {primary} tier unavailable ({primary_reason}), fell back to {fallback} tier",
                    decision.reason
                );
                decision.tier = fallback;
                decision.model = self.model_id(fallback).to_owned();
                tracing::info!(from = %primary, to = %fallback, "served by fallback tier");
                Ok(Dispatch { decision, reply })
            }
            Err(TierFailure::Unavailable(reason)) => Err(GatewayError::BackendUnavailable {
                tier: fallback,
                reason: format!("{primary}: {primary_reason}; {fallback}: {reason}"),
            }),
            Err(failure) => Err(Self::into_error(fallback, failure)),
        }
    }

    /// First tier cheaper than `tier` with a registered, available backend.
    async fn next_available(&self, tier: ModelTier) -> Option<ModelTier> {
        let mut candidate = tier.cheaper();
        while let Some(next) = candidate {
            if self.registry.is_available(next).await {
                return Some(next);
            }
            candidate = next.cheaper();
        }
        None
    }

    async fn invoke_tier(
        &self,
        tier: ModelTier,
        request: &PromptRequest,
    ) -> StdResult<BackendReply, TierFailure> {
        let Some(backend) = self.registry.get(tier) else {
            return Err(TierFailure::Unavailable("no backend registered".to_owned()));
        };
        if !backend.is_available().await {
            return Err(TierFailure::Unavailable(format!(
                "{} reports unavailable",
                backend.name()
            )));
        }

        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|error| {
                TierFailure::Internal(format!("backend permit pool closed: {error}"))
            })?;

        let invocation = Invocation::for_request(tier, request);
        match timeout(self.backend_timeout, backend.invoke(&invocation)).await {
            Err(_elapsed) => Err(TierFailure::Timeout(self.backend_timeout.as_millis() as u64)),
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(CoreError::Timeout { elapsed_ms })) => Err(TierFailure::Timeout(elapsed_ms)),
            Ok(Err(error)) if error.is_unavailable() => {
                Err(TierFailure::Unavailable(error.to_string()))
            }
            Ok(Err(error)) => Err(TierFailure::Failed(error)),
        }
    }

    fn into_error(tier: ModelTier, failure: TierFailure) -> GatewayError {
        match failure {
            TierFailure::Unavailable(reason) => GatewayError::BackendUnavailable { tier, reason },
            TierFailure::Timeout(timeout_ms) => GatewayError::BackendTimeout { tier, timeout_ms },
            TierFailure::Failed(error) => GatewayError::Backend(error),
            TierFailure::Internal(reason) => GatewayError::Internal(reason),
        }
    }
}
