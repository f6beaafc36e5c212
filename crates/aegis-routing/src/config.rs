//! Configuration types for caching, classification, routing, analysis, and backends.

use crate::error::{GatewayError, Result};
use aegis_core::{ModelTier, PromptRequest};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;

/// Characters per token used for cost estimates.
const CHARS_PER_TOKEN: f64 = 4.0;

/// Complete gateway configuration.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Response cache configuration
    pub cache: CacheConfig,
    /// Complexity classifier configuration
    pub classifier: ClassifierConfig,
    /// Tier selection and dispatch configuration
    pub routing: RoutingConfig,
    /// Hallucination analysis configuration
    pub analysis: AnalysisConfig,
    /// Backend endpoints and prices
    pub backends: BackendsConfig,
    /// HTTP surface configuration
    pub server: ServerConfig,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Maximum number of entries before LRU eviction
    pub capacity: usize,
    /// Time-to-live for cache entries in seconds
    pub ttl_secs: u64,
    /// Width of the temperature buckets folded into the cache key
    pub temperature_bucket: f32,
    /// Cost reported for a response served from the cache
    pub serve_cost: f64,
    /// How often expired entries are swept, in seconds
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 10_000,
            ttl_secs: 3600,
            temperature_bucket: 0.1,
            serve_cost: 0.0,
            sweep_interval_secs: 60,
        }
    }
}

/// Score boundaries between complexity tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityThresholds {
    /// Scores at or above this are at least moderate
    pub moderate: f64,
    /// Scores at or above this are complex
    pub complex: f64,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            moderate: 0.3,
            complex: 0.6,
        }
    }
}

/// Relative weight of each classifier signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    /// Prompt length
    pub length: f64,
    /// Reasoning indicators
    pub reasoning: f64,
    /// Presence and size of context
    pub context: f64,
    /// Specialised-domain vocabulary
    pub domain: f64,
}

impl SignalWeights {
    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.length + self.reasoning + self.context + self.domain
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            length: 0.2,
            reasoning: 0.4,
            context: 0.2,
            domain: 0.2,
        }
    }
}

/// Complexity classifier configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Tier boundaries
    pub thresholds: ComplexityThresholds,
    /// Signal weights
    pub weights: SignalWeights,
}

/// Routing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Tier used for simple prompts
    pub simple_tier: ModelTier,
    /// Tier used for moderate prompts
    pub moderate_tier: ModelTier,
    /// Tier used for complex prompts
    pub complex_tier: ModelTier,
    /// Deadline for a single backend call in milliseconds
    pub backend_timeout_ms: u64,
    /// Maximum backend calls in flight at once
    pub max_concurrent_calls: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            simple_tier: ModelTier::Small,
            moderate_tier: ModelTier::Medium,
            complex_tier: ModelTier::Large,
            backend_timeout_ms: 30_000,
            max_concurrent_calls: 32,
        }
    }
}

/// Hallucination analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Whether analysis runs at all
    pub enabled: bool,
    /// Fraction of non-large-tier responses that are analysed
    pub sample_rate: f64,
    /// Aggregate confidence above which a response is flagged
    pub threshold: f64,
    /// Lexical coverage at which a claim counts as supported
    pub support_threshold: f64,
    /// Maximum claims checked per response
    pub max_claims: usize,
    /// Deadline for the whole analysis in milliseconds
    pub timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 0.2,
            threshold: 0.6,
            support_threshold: 0.8,
            max_claims: 8,
            timeout_ms: 15_000,
        }
    }
}

/// A single backend endpoint and its prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Model identifier, reported in responses and statistics
    pub model: String,
    /// Chat completions URL
    pub endpoint: String,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// USD per 1000 prompt tokens
    pub input_cost_per_1k: f64,
    /// USD per 1000 completion tokens
    pub output_cost_per_1k: f64,
}

impl BackendConfig {
    fn new(model: &str, endpoint: &str, api_key_env: &str, input: f64, output: f64) -> Self {
        Self {
            model: model.to_owned(),
            endpoint: endpoint.to_owned(),
            api_key_env: Some(api_key_env.to_owned()),
            input_cost_per_1k: input,
            output_cost_per_1k: output,
        }
    }

    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| env::var(name).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Estimated USD cost of answering `request` with `response` on this backend.
    pub fn estimate_cost(&self, request: &PromptRequest, response: &str) -> f64 {
        let input_chars = request.prompt.chars().count()
            + request.context_text().map_or(0, |context| context.chars().count());
        let input_tokens = input_chars as f64 / CHARS_PER_TOKEN;
        let output_tokens = response.chars().count() as f64 / CHARS_PER_TOKEN;
        (input_tokens / 1000.0).mul_add(
            self.input_cost_per_1k,
            output_tokens / 1000.0 * self.output_cost_per_1k,
        )
    }
}

/// Backends for each tier plus the optional reasoning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Small tier
    pub small: BackendConfig,
    /// Medium tier
    pub medium: BackendConfig,
    /// Large tier
    pub large: BackendConfig,
    /// Backend used for claim verification; the large tier when absent
    #[serde(default)]
    pub reasoning: Option<BackendConfig>,
}

impl BackendsConfig {
    /// Configuration for `tier`.
    pub const fn for_tier(&self, tier: ModelTier) -> &BackendConfig {
        match tier {
            ModelTier::Small => &self.small,
            ModelTier::Medium => &self.medium,
            ModelTier::Large => &self.large,
        }
    }

    /// Model identifier for `tier`.
    pub fn model_id(&self, tier: ModelTier) -> &str {
        &self.for_tier(tier).model
    }

    /// Configuration of the backend used for claim verification.
    pub fn reasoning_backend(&self) -> &BackendConfig {
        self.reasoning.as_ref().unwrap_or(&self.large)
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            small: BackendConfig::new(
                "llama-3.1-8b-instant",
                "https://api.groq.com/openai/v1/chat/completions",
                "GROQ_API_KEY",
                0.000_05,
                0.000_08,
            ),
            medium: BackendConfig::new(
                "gpt-4o-mini",
                "https://api.openai.com/v1/chat/completions",
                "OPENAI_API_KEY",
                0.000_15,
                0.000_6,
            ),
            large: BackendConfig::new(
                "gpt-4o",
                "https://api.openai.com/v1/chat/completions",
                "OPENAI_API_KEY",
                0.002_5,
                0.01,
            ),
            reasoning: None,
        }
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
    /// Origins allowed by CORS; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_owned(),
            cors_origins: vec![
                "http://localhost:5173".to_owned(),
                "http://localhost:3000".to_owned(),
                "https://aegis.vercel.app".to_owned(),
            ],
        }
    }
}

fn unit_interval(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GatewayError::Config(format!(
            "{name} must lie in [0, 1], got {value}"
        )))
    }
}

impl GatewayConfig {
    /// Get the default config directory path (`~/.aegis`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        use dirs::home_dir;
        let home = home_dir().ok_or_else(|| {
            GatewayError::Config("Could not determine home directory".to_owned())
        })?;
        Ok(home.join(".aegis"))
    }

    /// Get the default config file path (`~/.aegis/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with defaults if missing.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load and validate config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load_from_file(path: &Path) -> Result<Self> {
        use toml::from_str;
        let contents = fs::read_to_string(path)
            .map_err(|error| GatewayError::Config(format!("Failed to read config: {error}")))?;
        let config: Self = from_str(&contents)
            .map_err(|error| GatewayError::Config(format!("Failed to parse config: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        use toml::to_string_pretty;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                GatewayError::Config(format!("Failed to create config directory: {error}"))
            })?;
        }

        let contents = to_string_pretty(self).map_err(|error| {
            GatewayError::Config(format!("Failed to serialize config: {error}"))
        })?;

        let header = "# Aegis Gateway Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))
            .map_err(|error| GatewayError::Config(format!("Failed to write config: {error}")))?;

        Ok(())
    }

    /// Check every setting for consistency.
    ///
    /// # Errors
    /// Returns [`GatewayError::Config`] naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        let thresholds = self.classifier.thresholds;
        if !(thresholds.moderate > 0.0
            && thresholds.moderate < thresholds.complex
            && thresholds.complex < 1.0)
        {
            return Err(GatewayError::Config(format!(
                "thresholds must satisfy 0 < moderate < complex < 1, got {} and {}",
                thresholds.moderate, thresholds.complex
            )));
        }

        let weights = self.classifier.weights;
        let all_weights = [weights.length, weights.reasoning, weights.context, weights.domain];
        if all_weights
            .iter()
            .any(|weight| !weight.is_finite() || *weight < 0.0)
            || weights.total() <= 0.0
        {
            return Err(GatewayError::Config(
                "signal weights must be non-negative with a positive sum".to_owned(),
            ));
        }

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(GatewayError::Config(
                "cache capacity must be positive when caching is enabled".to_owned(),
            ));
        }
        if !(self.cache.temperature_bucket.is_finite() && self.cache.temperature_bucket > 0.0) {
            return Err(GatewayError::Config(
                "temperature bucket width must be positive".to_owned(),
            ));
        }
        if !(self.cache.serve_cost.is_finite() && self.cache.serve_cost >= 0.0) {
            return Err(GatewayError::Config(
                "cache serve cost must be non-negative".to_owned(),
            ));
        }

        if self.routing.backend_timeout_ms == 0 || self.analysis.timeout_ms == 0 {
            return Err(GatewayError::Config("timeouts must be positive".to_owned()));
        }
        if self.routing.max_concurrent_calls == 0 {
            return Err(GatewayError::Config(
                "max_concurrent_calls must be positive".to_owned(),
            ));
        }
        if self.routing.max_concurrent_calls > Semaphore::MAX_PERMITS {
            return Err(GatewayError::Config(format!(
                "max_concurrent_calls must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }

        unit_interval("analysis.sample_rate", self.analysis.sample_rate)?;
        unit_interval("analysis.threshold", self.analysis.threshold)?;
        unit_interval("analysis.support_threshold", self.analysis.support_threshold)?;

        for tier in ModelTier::ALL {
            if self.backends.model_id(tier).trim().is_empty() {
                return Err(GatewayError::Config(format!(
                    "{tier} tier needs a model identifier"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, to_string};
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.routing.max_concurrent_calls, 32);
        assert_eq!(config.backends.model_id(ModelTier::Large), "gpt-4o");
        assert_eq!(config.backends.reasoning_backend().model, "gpt-4o");
    }

    #[test]
    fn test_serialization() {
        let config = GatewayConfig::default();
        let json = match to_string(&config) {
            Ok(serialized_json) => serialized_json,
            Err(error) => panic!("serialize failed: {error}"),
        };
        let deserialized: GatewayConfig = match from_str(&json) {
            Ok(value) => value,
            Err(error) => panic!("deserialize failed: {error}"),
        };
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_save_and_load_toml() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let path = dir.path().join("nested").join("config.toml");

        let mut config = GatewayConfig::default();
        config.cache.capacity = 7;
        config.analysis.sample_rate = 1.0;
        assert!(config.save_to_file(&path).is_ok());

        let contents = fs::read_to_string(&path).unwrap_or_default();
        assert!(contents.starts_with("# Aegis Gateway Configuration File"));

        let loaded = match GatewayConfig::load_from_file(&path) {
            Ok(loaded) => loaded,
            Err(error) => panic!("load failed: {error}"),
        };
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: GatewayConfig = match toml::from_str("[cache]\ncapacity = 3\n") {
            Ok(config) => config,
            Err(error) => panic!("parse failed: {error}"),
        };
        assert_eq!(config.cache.capacity, 3);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.routing.complex_tier, ModelTier::Large);
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = GatewayConfig::default();
        config.classifier.thresholds = ComplexityThresholds {
            moderate: 0.7,
            complex: 0.6,
        };
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));

        config.classifier.thresholds = ComplexityThresholds {
            moderate: 0.0,
            complex: 0.6,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut sampling = GatewayConfig::default();
        sampling.analysis.sample_rate = 1.5;
        assert!(sampling.validate().is_err());

        let mut cache = GatewayConfig::default();
        cache.cache.capacity = 0;
        assert!(cache.validate().is_err());
        cache.cache.enabled = false;
        assert!(cache.validate().is_ok());

        let mut routing = GatewayConfig::default();
        routing.routing.max_concurrent_calls = 0;
        assert!(routing.validate().is_err());
        routing.routing.max_concurrent_calls = Semaphore::MAX_PERMITS;
        assert!(routing.validate().is_ok());
        routing.routing.max_concurrent_calls = Semaphore::MAX_PERMITS + 1;
        assert!(matches!(routing.validate(), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_estimate_cost_uses_character_heuristic() {
        let backend = BackendConfig::new("m", "http://localhost", "UNUSED", 1.0, 2.0);
        let request = PromptRequest::new("x".repeat(4000));
        let cost = backend.estimate_cost(&request, &"y".repeat(2000));
        assert!((cost - 2.0).abs() < 1e-9);
    }
}
