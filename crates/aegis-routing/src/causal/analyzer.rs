use super::claims::{Claim, extract_claims, source_vocabulary};
use crate::cache::CacheKey;
use crate::config::AnalysisConfig;
use crate::error::{GatewayError, Result};
use aegis_core::{CausalAnalysis, Invocation, ModelBackend, ModelTier};
use futures::future::try_join_all;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::time::timeout;

/// Weight of lexical evidence against the reasoning backend's verdict.
const LEXICAL_WEIGHT: f64 = 0.5;
/// Discount applied to claims that assert no cause and effect.
const NON_CAUSAL_DISCOUNT: f64 = 0.85;
/// Token budget for a verdict.
const VERDICT_MAX_TOKENS: u32 = 50;
/// Separator between claims in a reported pathway.
const PATHWAY_SEPARATOR: &str = " -> ";

static NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").ok());

/// A claim with its final probability of being unsupported.
#[derive(Debug, Clone)]
struct ScoredClaim {
    claim: Claim,
    confidence: f64,
}

/// Checks generated responses for claims the prompt and context do not support.
///
/// Claims whose content words mostly appear in the prompt or context are taken
/// as supported outright. The rest are put to a reasoning backend, whose
/// verdicts are combined with the lexical evidence and aggregated with a
/// noisy-OR, so each additional unsupported claim can only raise confidence.
pub struct CausalAnalyzer {
    backend: Arc<dyn ModelBackend>,
    config: AnalysisConfig,
}

impl CausalAnalyzer {
    /// Creates an analyzer that verifies claims with `backend`.
    pub fn new(backend: Arc<dyn ModelBackend>, config: AnalysisConfig) -> Self {
        Self { backend, config }
    }

    /// Whether a freshly generated response served by `tier` should be analysed.
    ///
    /// Large-tier responses are always analysed. Others are sampled
    /// deterministically by fingerprint, so a given request is either always
    /// or never sampled.
    pub fn should_analyze(&self, tier: ModelTier, key: &CacheKey) -> bool {
        if !self.config.enabled {
            return false;
        }
        tier == ModelTier::Large || key.sample_fraction() < self.config.sample_rate
    }

    /// Analyse `response` under the configured deadline.
    ///
    /// # Errors
    /// Returns [`GatewayError::AnalysisFailed`] if the deadline passes, the
    /// reasoning backend fails, or a verdict cannot be parsed.
    pub async fn analyze(
        &self,
        prompt: &str,
        context: Option<&str>,
        response: &str,
    ) -> Result<CausalAnalysis> {
        let deadline = Duration::from_millis(self.config.timeout_ms);
        timeout(deadline, self.analyze_claims(prompt, context, response))
            .await
            .map_err(|_elapsed| {
                GatewayError::AnalysisFailed(format!(
                    "analysis exceeded {}ms",
                    self.config.timeout_ms
                ))
            })?
    }

    async fn analyze_claims(
        &self,
        prompt: &str,
        context: Option<&str>,
        response: &str,
    ) -> Result<CausalAnalysis> {
        let vocabulary = source_vocabulary(prompt, context);
        let claims = extract_claims(response, &vocabulary, self.config.max_claims);
        let claim_count = claims.len();

        let unsupported: Vec<Claim> = claims
            .into_iter()
            .filter(|claim| claim.coverage < self.config.support_threshold)
            .collect();

        let source = match context {
            Some(context) => format!("{prompt}\n\n{context}"),
            None => prompt.to_owned(),
        };
        let verdicts = try_join_all(
            unsupported
                .iter()
                .map(|claim| self.verify(&source, &claim.text)),
        )
        .await?;

        let scored: Vec<ScoredClaim> = unsupported
            .into_iter()
            .zip(verdicts)
            .map(|(claim, verdict)| {
                let confidence = claim_confidence(&claim, verdict);
                ScoredClaim { claim, confidence }
            })
            .collect();

        Ok(self.summarize(claim_count, &scored))
    }

    /// Asks the reasoning backend how likely `claim` is to be unsupported by `source`.
    async fn verify(&self, source: &str, claim: &str) -> Result<f64> {
        let invocation = Invocation {
            tier: ModelTier::Large,
            prompt: format!(
                "Source:\n{source}\n\nClaim: {claim}\n\n\
                 Reply with only a number between 0 and 1: the probability that the claim \
                 is NOT supported by the source."
            ),
            context: None,
            max_tokens: VERDICT_MAX_TOKENS,
            temperature: 0.0,
        };

        let reply = self
            .backend
            .invoke(&invocation)
            .await
            .map_err(|error| GatewayError::AnalysisFailed(error.to_string()))?;

        parse_verdict(&reply.text).ok_or_else(|| {
            GatewayError::AnalysisFailed(format!("unparseable verdict: {}", reply.text.trim()))
        })
    }

    fn summarize(&self, claim_count: usize, scored: &[ScoredClaim]) -> CausalAnalysis {
        let confidence = 1.0
            - scored
                .iter()
                .map(|scored_claim| 1.0 - scored_claim.confidence)
                .product::<f64>();
        let confidence = confidence.clamp(0.0, 1.0);
        let is_hallucination = confidence > self.config.threshold;

        let causal_chain: Vec<&str> = scored
            .iter()
            .filter(|scored_claim| {
                scored_claim.claim.causal && scored_claim.confidence > self.config.threshold
            })
            .map(|scored_claim| scored_claim.claim.text.as_str())
            .collect();
        let pathway = (!causal_chain.is_empty()).then(|| causal_chain.join(PATHWAY_SEPARATOR));

        let strongest = scored
            .iter()
            .max_by(|left, right| left.confidence.total_cmp(&right.confidence));

        let explanation = match strongest {
            None if claim_count == 0 => "No factual claims found in the response".to_owned(),
            None => format!("All {claim_count} claims are supported by the prompt or context"),
            Some(top) if is_hallucination => format!(
                "Claim \"{}\" is not supported by the prompt or context (confidence {:.2})",
                top.claim.text, top.confidence
            ),
            Some(top) => format!(
                "Least supported claim \"{}\" scored {:.2}; aggregate {confidence:.2} is within the {:.2} threshold",
                top.claim.text, top.confidence, self.config.threshold
            ),
        };

        CausalAnalysis {
            confidence,
            pathway,
            is_hallucination,
            explanation,
        }
    }
}

/// Probability that a single claim is unsupported.
fn claim_confidence(claim: &Claim, verdict: f64) -> f64 {
    let lexical = 1.0 - claim.coverage;
    let combined = LEXICAL_WEIGHT.mul_add(lexical, (1.0 - LEXICAL_WEIGHT) * verdict);
    let discounted = if claim.causal {
        combined
    } else {
        combined * NON_CAUSAL_DISCOUNT
    };
    discounted.clamp(0.0, 1.0)
}

/// Reads a probability from a verdict, falling back to keywords.
fn parse_verdict(text: &str) -> Option<f64> {
    let numeric = NUMBER.as_ref().and_then(|pattern| {
        pattern
            .find_iter(text)
            .filter_map(|found| found.as_str().parse::<f64>().ok())
            .find(|value| (0.0..=1.0).contains(value))
    });
    if numeric.is_some() {
        return numeric;
    }

    let lower = text.to_lowercase();
    if lower.contains("unsupported") || lower.contains("not supported") {
        Some(1.0)
    } else if lower.contains("supported") {
        Some(0.0)
    } else {
        None
    }
}
