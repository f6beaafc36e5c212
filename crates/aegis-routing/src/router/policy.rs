use crate::analyzer::{ComplexityScore, ComplexityTier};
use crate::config::{ComplexityThresholds, RoutingConfig};
use aegis_core::ModelTier;

/// Maps complexity to a tier and explains the choice.
#[derive(Debug, Clone)]
pub struct TierPolicy {
    thresholds: ComplexityThresholds,
    simple: ModelTier,
    moderate: ModelTier,
    complex: ModelTier,
}

impl TierPolicy {
    /// Creates a policy from the classifier thresholds and routing table.
    pub fn new(thresholds: ComplexityThresholds, routing: &RoutingConfig) -> Self {
        Self {
            thresholds,
            simple: routing.simple_tier,
            moderate: routing.moderate_tier,
            complex: routing.complex_tier,
        }
    }

    /// Tier configured for a complexity class.
    pub const fn tier_for(&self, complexity: ComplexityTier) -> ModelTier {
        match complexity {
            ComplexityTier::Simple => self.simple,
            ComplexityTier::Moderate => self.moderate,
            ComplexityTier::Complex => self.complex,
        }
    }

    /// Confidence in `[0.5, 1]`, falling as the score nears a tier boundary.
    pub fn confidence(&self, score: f64) -> f64 {
        let score = score.clamp(0.0, 1.0);
        let ComplexityThresholds { moderate, complex } = self.thresholds;

        let (distance, span) = if score < moderate {
            (moderate - score, moderate)
        } else if score < complex {
            (
                (score - moderate).min(complex - score),
                (complex - moderate) / 2.0,
            )
        } else {
            (score - complex, 1.0 - complex)
        };

        if span <= 0.0 {
            return 1.0;
        }
        0.5f64.mul_add((distance / span).clamp(0.0, 1.0), 0.5)
    }

    /// Rationale naming the score and the threshold that decided it.
    pub fn reason(&self, complexity: &ComplexityScore, tier: ModelTier) -> String {
        let ComplexityThresholds { moderate, complex } = self.thresholds;
        let score = complexity.score;
        match complexity.tier {
            ComplexityTier::Complex => format!(
                "complexity score {score:.2} exceeds threshold {complex:.2} for {tier}-tier routing"
            ),
            ComplexityTier::Moderate => format!(
                "complexity score {score:.2} lies between thresholds {moderate:.2} and \
                 {complex:.2} for {tier}-tier routing"
            ),
            ComplexityTier::Simple => format!(
                "complexity score {score:.2} is below threshold {moderate:.2} for {tier}-tier routing"
            ),
        }
    }
}
