use crate::config::{ClassifierConfig, ComplexityThresholds, SignalWeights};
use aegis_core::PromptRequest;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::LazyLock;

/// Prompt length (in characters) at which the length signal saturates.
const LENGTH_SATURATION_CHARS: f64 = 2000.0;
/// Context length (in characters) at which the context signal saturates.
const CONTEXT_SATURATION_CHARS: f64 = 10_000.0;
/// Context signal for any non-empty context.
const CONTEXT_FLOOR: f64 = 0.3;
/// Reasoning indicator hits needed to saturate the reasoning signal.
const REASONING_SATURATION: f64 = 4.0;
/// Distinct domain terms needed to saturate the domain signal.
const DOMAIN_SATURATION: f64 = 3.0;

const REASONING_KEYWORDS: &[&str] = &[
    "step by step",
    "explain why",
    "prove",
    "derive",
    "implement",
    "algorithm",
    "function",
    "debug",
    "refactor",
    "compare",
    "analyze",
    "analyse",
    "design",
    "optimize",
    "evaluate",
    "trade-off",
    "calculate",
    "solve",
];

const DOMAIN_KEYWORDS: &[&str] = &[
    "legal",
    "lawsuit",
    "contract",
    "medical",
    "diagnos",
    "clinical",
    "financial",
    "investment",
    "regulat",
    "scientific",
    "quantum",
    "theorem",
    "security",
    "cryptograph",
    "distributed",
    "consensus",
    "concurren",
    "architecture",
];

static ARITHMETIC: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d\s*[-+*/^=]\s*\d").ok());
static NUMBERED_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s").ok());

/// Coarse complexity class derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    /// Short factual or conversational prompt
    Simple,
    /// Some reasoning or context
    Moderate,
    /// Multi-step reasoning, long context, or specialised domain
    Complex,
}

impl Display for ComplexityTier {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        })
    }
}

impl ComplexityThresholds {
    /// Tier a score falls into.
    pub fn tier_for(&self, score: f64) -> ComplexityTier {
        if score >= self.complex {
            ComplexityTier::Complex
        } else if score >= self.moderate {
            ComplexityTier::Moderate
        } else {
            ComplexityTier::Simple
        }
    }
}

/// Individual signals feeding the score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexitySignals {
    /// Prompt length
    pub length: f64,
    /// Reasoning indicators
    pub reasoning: f64,
    /// Context presence and size
    pub context: f64,
    /// Specialised-domain vocabulary
    pub domain: f64,
}

/// Classifier output for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityScore {
    /// Weighted score in `[0, 1]`
    pub score: f64,
    /// Tier the score falls into
    pub tier: ComplexityTier,
    /// Signals the score was built from
    pub signals: ComplexitySignals,
}

/// Deterministic, offline prompt complexity classifier.
#[derive(Debug, Clone, Default)]
pub struct ComplexityClassifier {
    thresholds: ComplexityThresholds,
    weights: SignalWeights,
}

impl ComplexityClassifier {
    /// Creates a classifier from validated configuration.
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            weights: config.weights,
        }
    }

    /// Tier boundaries in use.
    pub const fn thresholds(&self) -> ComplexityThresholds {
        self.thresholds
    }

    /// Score a request.
    pub fn classify(&self, request: &PromptRequest) -> ComplexityScore {
        let prompt_lower = request.prompt.to_lowercase();
        let signals = ComplexitySignals {
            length: Self::score_length(&request.prompt),
            reasoning: Self::score_reasoning(&request.prompt, &prompt_lower),
            context: Self::score_context(request.context_text()),
            domain: Self::score_domain(&prompt_lower),
        };

        let weights = self.weights;
        let weighted = weights.length * signals.length
            + weights.reasoning * signals.reasoning
            + weights.context * signals.context
            + weights.domain * signals.domain;
        let total = weights.total();
        let score = if total > 0.0 {
            (weighted / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        ComplexityScore {
            score,
            tier: self.thresholds.tier_for(score),
            signals,
        }
    }

    fn score_length(prompt: &str) -> f64 {
        (prompt.chars().count() as f64 / LENGTH_SATURATION_CHARS).min(1.0)
    }

    fn score_reasoning(prompt: &str, prompt_lower: &str) -> f64 {
        let mut hits = REASONING_KEYWORDS
            .iter()
            .filter(|keyword| prompt_lower.contains(*keyword))
            .count();

        // Code is weighted double
        if prompt.contains("```") {
            hits += 2;
        }

        if ARITHMETIC
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(prompt))
        {
            hits += 1;
        }

        let numbered_lines = NUMBERED_LINE
            .as_ref()
            .map_or(0, |pattern| pattern.find_iter(prompt).count());
        if numbered_lines >= 2 || prompt.matches('?').count() >= 2 {
            hits += 1;
        }

        (hits as f64 / REASONING_SATURATION).min(1.0)
    }

    fn score_context(context: Option<&str>) -> f64 {
        context.map_or(0.0, |text| {
            let size = (text.chars().count() as f64 / CONTEXT_SATURATION_CHARS).min(1.0);
            (1.0 - CONTEXT_FLOOR).mul_add(size, CONTEXT_FLOOR)
        })
    }

    fn score_domain(prompt_lower: &str) -> f64 {
        let hits = DOMAIN_KEYWORDS
            .iter()
            .filter(|keyword| prompt_lower.contains(*keyword))
            .count();
        (hits as f64 / DOMAIN_SATURATION).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLEX_PROMPT: &str = "Design a distributed consensus algorithm step by step, prove \
        its safety, and implement it in Rust:\n\
        1. Explain why leader election is needed\n\
        2. Compare it with Paxos\n\
        3. Analyze the security implications";

    fn classifier() -> ComplexityClassifier {
        ComplexityClassifier::default()
    }

    #[test]
    fn test_arithmetic_question_is_simple() {
        let score = classifier().classify(&PromptRequest::new("What is 2+2?"));
        assert_eq!(score.tier, ComplexityTier::Simple);
        assert!(score.score < 0.3);
        assert!(score.signals.reasoning > 0.0);
    }

    #[test]
    fn test_greeting_is_simple() {
        let score = classifier().classify(&PromptRequest::new("Hello there"));
        assert_eq!(score.tier, ComplexityTier::Simple);
        assert!(score.signals.domain.abs() < f64::EPSILON);
        assert!(score.signals.context.abs() < f64::EPSILON);
    }

    #[test]
    fn test_coding_prompt_is_moderate() {
        let request = PromptRequest::new(
            "Write a function that parses dates, explain why edge cases matter, and compare \
             two approaches to debug failures.",
        );
        let score = classifier().classify(&request);
        assert_eq!(score.tier, ComplexityTier::Moderate, "score {}", score.score);
    }

    #[test]
    fn test_multi_step_domain_prompt_is_complex() {
        let request = PromptRequest::new(COMPLEX_PROMPT)
            .with_context("The cluster runs across three regions with unreliable links.");
        let score = classifier().classify(&request);
        assert_eq!(score.tier, ComplexityTier::Complex, "score {}", score.score);
        assert!((score.signals.reasoning - 1.0).abs() < f64::EPSILON);
        assert!((score.signals.domain - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_context_raises_score() {
        let bare = PromptRequest::new("Summarise the notes");
        let with_context = bare.clone().with_context("n".repeat(5000));
        let low = classifier().classify(&bare).score;
        let high = classifier().classify(&with_context).score;
        assert!(high > low);
    }

    #[test]
    fn test_blank_context_ignored() {
        let bare = PromptRequest::new("Summarise the notes");
        let blank = bare.clone().with_context("   ");
        assert_eq!(classifier().classify(&bare), classifier().classify(&blank));
    }

    #[test]
    fn test_code_fence_counts_double() {
        let request = PromptRequest::new("Why does this fail?\n```\nlet x = 1;\n```");
        let score = classifier().classify(&request);
        assert!(score.signals.reasoning >= 0.5);
    }

    #[test]
    fn test_score_is_bounded() {
        let long = "Analyze and prove the theorem step by step. ".repeat(200);
        let request = PromptRequest::new(long).with_context("c".repeat(20_000));
        let score = classifier().classify(&request);
        assert!((0.0..=1.0).contains(&score.score));
        assert_eq!(score.tier, ComplexityTier::Complex);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let request = PromptRequest::new(COMPLEX_PROMPT);
        assert_eq!(classifier().classify(&request), classifier().classify(&request));
    }

    #[test]
    fn test_thresholds_map_boundaries_upward() {
        let thresholds = ComplexityThresholds::default();
        assert_eq!(thresholds.tier_for(0.0), ComplexityTier::Simple);
        assert_eq!(thresholds.tier_for(0.3), ComplexityTier::Moderate);
        assert_eq!(thresholds.tier_for(0.6), ComplexityTier::Complex);
        assert_eq!(thresholds.tier_for(1.0), ComplexityTier::Complex);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ClassifierConfig {
            thresholds: ComplexityThresholds {
                moderate: 0.05,
                complex: 0.09,
            },
            weights: SignalWeights::default(),
        };
        let score = ComplexityClassifier::new(&config).classify(&PromptRequest::new("What is 2+2?"));
        assert_eq!(score.tier, ComplexityTier::Complex);
    }
}
