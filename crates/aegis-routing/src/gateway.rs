use std::sync::Arc;
use std::time::{Duration, Instant};

use aegis_core::{AggregateStats, CausalAnalysis, LLMResponse, ModelBackend, ModelTier, PromptRequest};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::analyzer::ComplexityClassifier;
use crate::cache::{CacheEntry, CacheKey, ResponseCache};
use crate::causal::CausalAnalyzer;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::metrics::{MetricsAggregator, RequestOutcome};
use crate::router::{BackendRegistry, Routed, TierRouter, http_backend};

/// Entry point that ties classification, caching, routing, analysis, and metrics together.
///
/// Cloning is cheap; clones share every component.
#[derive(Clone)]
pub struct Gateway {
    config: Arc<GatewayConfig>,
    classifier: Arc<ComplexityClassifier>,
    cache: Arc<ResponseCache>,
    router: Arc<TierRouter>,
    analyzer: Option<Arc<CausalAnalyzer>>,
    metrics: Arc<MetricsAggregator>,
}

impl Gateway {
    /// Creates a gateway over `registry` without a reasoning backend.
    ///
    /// # Errors
    /// Returns an error if `config` fails validation.
    pub fn new(config: GatewayConfig, registry: BackendRegistry) -> Result<Self> {
        config.validate()?;

        let classifier = Arc::new(ComplexityClassifier::new(&config.classifier));
        let cache = Arc::new(ResponseCache::new(config.cache.clone()));
        let router = Arc::new(TierRouter::new(&config, registry));
        let metrics = Arc::new(MetricsAggregator::new(
            ModelTier::ALL.map(|tier| config.backends.model_id(tier).to_owned()),
        ));

        Ok(Self {
            config: Arc::new(config),
            classifier,
            cache,
            router,
            analyzer: None,
            metrics,
        })
    }

    /// Creates a gateway whose tiers and reasoning backend are HTTP endpoints from `config`.
    ///
    /// # Errors
    /// Returns an error if `config` fails validation or an HTTP client cannot be built.
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.routing.backend_timeout_ms);
        let registry = BackendRegistry::from_config(&config.backends, timeout)?;
        let reasoning = http_backend(config.backends.reasoning_backend(), timeout)?;

        let gateway = Self::new(config, registry)?;
        Ok(match reasoning {
            Some(backend) => gateway.with_reasoning_backend(Arc::new(backend)),
            None => gateway,
        })
    }

    /// Sets the backend used to verify claims, enabling hallucination analysis.
    #[must_use]
    pub fn with_reasoning_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.analyzer = Some(Arc::new(CausalAnalyzer::new(
            backend,
            self.config.analysis.clone(),
        )));
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The response cache.
    pub const fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Backends registered per tier.
    pub fn registry(&self) -> &BackendRegistry {
        self.router.registry()
    }

    /// The metrics aggregator.
    pub const fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    /// Serve one prompt.
    ///
    /// Statistics and the cache are only updated once a response is complete or
    /// every backend has failed. Cache hits report their own wall time; fresh
    /// responses report the latency measured by the backend that served them.
    ///
    /// # Errors
    /// Returns [`GatewayError::Validation`] for malformed requests, before any
    /// backend is contacted, and routing errors when no backend can serve.
    pub async fn submit(&self, request: PromptRequest) -> Result<LLMResponse> {
        let started = Instant::now();
        request.validate()?;
        let request_id = Uuid::new_v4();

        match self.router.route(&request, &self.cache, &self.classifier) {
            Routed::Cached {
                entry, decision, ..
            } => {
                let cost = self.config.cache.serve_cost;
                let baseline_cost = self
                    .config
                    .backends
                    .large
                    .estimate_cost(&request, &entry.response);
                let latency_ms = elapsed_ms(started);

                self.metrics.record(&RequestOutcome {
                    tier: entry.tier,
                    cost,
                    baseline_cost,
                    latency_ms,
                    cache_hit: true,
                    hallucination: false,
                    analysis_failed: false,
                });

                tracing::info!(%request_id, model = %entry.model, latency_ms, "cache hit");
                Ok(LLMResponse {
                    response: entry.response,
                    model_used: entry.model,
                    cost,
                    latency_ms,
                    routing_decision: decision,
                    causal_analysis: entry.causal_analysis,
                    request_id,
                })
            }
            Routed::Fresh {
                key,
                complexity,
                decision,
            } => {
                tracing::debug!(
                    %request_id,
                    score = complexity.score,
                    tier = %complexity.tier,
                    "classified request"
                );

                let dispatch = match self.router.dispatch(decision, &request).await {
                    Ok(dispatch) => dispatch,
                    Err(error) => {
                        self.metrics.record_failed_lookup();
                        tracing::warn!(%request_id, %error, "no backend could serve request");
                        return Err(error);
                    }
                };
                let tier = dispatch.decision.tier;
                let (causal_analysis, analysis_failed) = self
                    .run_analysis(&request, &key, tier, &dispatch.reply.text)
                    .await;

                let cost = dispatch.reply.cost.max(0.0);
                let baseline_cost = self
                    .config
                    .backends
                    .large
                    .estimate_cost(&request, &dispatch.reply.text);

                self.cache.insert(
                    key,
                    CacheEntry::new(
                        dispatch.reply.text.clone(),
                        tier,
                        dispatch.decision.model.clone(),
                        cost,
                    )
                    .with_analysis(causal_analysis.clone()),
                );

                let latency_ms = dispatch.reply.latency_ms;
                self.metrics.record(&RequestOutcome {
                    tier,
                    cost,
                    baseline_cost,
                    latency_ms,
                    cache_hit: false,
                    hallucination: causal_analysis
                        .as_ref()
                        .is_some_and(|analysis| analysis.is_hallucination),
                    analysis_failed,
                });

                tracing::info!(
                    %request_id,
                    model = %dispatch.decision.model,
                    cost,
                    latency_ms,
                    "request served"
                );

                Ok(LLMResponse {
                    response: dispatch.reply.text,
                    model_used: dispatch.decision.model.clone(),
                    cost,
                    latency_ms,
                    routing_decision: dispatch.decision,
                    causal_analysis,
                    request_id,
                })
            }
        }
    }

    /// Serve one prompt, abandoning it if `token` is cancelled first.
    ///
    /// An abandoned request leaves the cache and statistics untouched.
    ///
    /// # Errors
    /// Returns [`GatewayError::Cancelled`] on cancellation, otherwise as [`Self::submit`].
    pub async fn submit_with_cancellation(
        &self,
        request: PromptRequest,
        token: &CancellationToken,
    ) -> Result<LLMResponse> {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(GatewayError::Cancelled),
            result = self.submit(request) => result,
        }
    }

    /// Current aggregate statistics.
    pub fn stats(&self) -> AggregateStats {
        self.metrics.snapshot()
    }

    /// Zero the statistics. The cache is left intact.
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    /// Runs analysis if the policy selects this response.
    ///
    /// Returns the analysis, if any, and whether an attempted analysis failed.
    async fn run_analysis(
        &self,
        request: &PromptRequest,
        key: &CacheKey,
        tier: ModelTier,
        response: &str,
    ) -> (Option<CausalAnalysis>, bool) {
        let Some(analyzer) = &self.analyzer else {
            return (None, false);
        };
        if !analyzer.should_analyze(tier, key) {
            return (None, false);
        }

        match analyzer
            .analyze(&request.prompt, request.context_text(), response)
            .await
        {
            Ok(analysis) => {
                if analysis.is_hallucination {
                    tracing::warn!(
                        confidence = analysis.confidence,
                        explanation = %analysis.explanation,
                        "possible hallucination"
                    );
                }
                (Some(analysis), false)
            }
            Err(error) => {
                tracing::warn!(%error, "causal analysis failed, returning response without it");
                (None, true)
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
