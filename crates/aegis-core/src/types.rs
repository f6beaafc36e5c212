use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 4000;
/// Maximum context length in characters.
pub const MAX_CONTEXT_CHARS: usize = 10_000;
/// Smallest accepted `max_tokens`.
pub const MIN_MAX_TOKENS: u32 = 50;
/// Largest accepted `max_tokens`.
pub const MAX_MAX_TOKENS: u32 = 4000;
/// Largest accepted sampling temperature.
pub const MAX_TEMPERATURE: f32 = 2.0;

const fn default_max_tokens() -> u32 {
    500
}

const fn default_temperature() -> f32 {
    0.7
}

/// A request rejected before it reached the routing engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A prompt submitted to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    /// The user's prompt.
    pub prompt: String,
    /// Optional supporting context.
    #[serde(default)]
    pub context: Option<String>,
    /// Maximum number of tokens in the response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl PromptRequest {
    /// Creates a request with default generation parameters.
    pub fn new<T: Into<String>>(prompt: T) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    /// Attaches supporting context.
    #[must_use]
    pub fn with_context<T: Into<String>>(mut self, context: T) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Sets the response token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Context text, treating blank context as absent.
    pub fn context_text(&self) -> Option<&str> {
        self.context
            .as_deref()
            .filter(|context| !context.trim().is_empty())
    }

    /// Checks every field against the accepted ranges.
    ///
    /// # Errors
    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let prompt_chars = self.prompt.chars().count();
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::new("prompt", "must not be empty"));
        }
        if prompt_chars > MAX_PROMPT_CHARS {
            return Err(ValidationError::new(
                "prompt",
                format!("{prompt_chars} characters exceeds the limit of {MAX_PROMPT_CHARS}"),
            ));
        }

        if let Some(context) = &self.context {
            let context_chars = context.chars().count();
            if context_chars > MAX_CONTEXT_CHARS {
                return Err(ValidationError::new(
                    "context",
                    format!(
                        "{context_chars} characters exceeds the limit of {MAX_CONTEXT_CHARS}"
                    ),
                ));
            }
        }

        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.max_tokens) {
            return Err(ValidationError::new(
                "max_tokens",
                format!(
                    "{} is outside {MIN_MAX_TOKENS}..={MAX_MAX_TOKENS}",
                    self.max_tokens
                ),
            ));
        }

        if !self.temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(ValidationError::new(
                "temperature",
                format!("{} is outside 0.0..={MAX_TEMPERATURE}", self.temperature),
            ));
        }

        Ok(())
    }
}

/// Cost and capability class of a backend model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheapest, fastest backend.
    Small,
    /// Mid-range backend.
    Medium,
    /// Most capable and most expensive backend.
    Large,
}

impl ModelTier {
    /// Every tier, cheapest first.
    pub const ALL: [Self; 3] = [Self::Small, Self::Medium, Self::Large];

    /// The next cheaper tier, used for fallback.
    #[must_use]
    pub const fn cheaper(self) -> Option<Self> {
        match self {
            Self::Small => None,
            Self::Medium => Some(Self::Small),
            Self::Large => Some(Self::Medium),
        }
    }

    /// Stable position of the tier in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Small => 0,
            Self::Medium => 1,
            Self::Large => 2,
        }
    }

    /// Lowercase name of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl Display for ModelTier {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.as_str())
    }
}

/// One call to a model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Tier the call is made on behalf of.
    pub tier: ModelTier,
    /// Prompt text.
    pub prompt: String,
    /// Optional supporting context.
    pub context: Option<String>,
    /// Response token budget.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Invocation {
    /// Builds the invocation for a validated request.
    pub fn for_request(tier: ModelTier, request: &PromptRequest) -> Self {
        Self {
            tier,
            prompt: request.prompt.clone(),
            context: request.context_text().map(ToOwned::to_owned),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

/// What a backend returns for a successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendReply {
    /// Generated text.
    pub text: String,
    /// Actual cost in USD.
    pub cost: f64,
    /// Latency reported by the backend.
    pub latency_ms: u64,
}
