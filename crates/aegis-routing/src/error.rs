use aegis_core::{Error as CoreError, ModelTier, ValidationError};
use std::result::Result as StdResult;
use thiserror::Error;

/// Result alias used throughout the gateway.
pub type Result<T> = StdResult<T, GatewayError>;

/// Everything that can go wrong while serving a request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request was rejected before routing.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Neither the selected tier nor its fallback could serve the request.
    #[error("Backend unavailable for {tier} tier: {reason}")]
    BackendUnavailable {
        /// Last tier attempted.
        tier: ModelTier,
        /// Why the backend(s) could not serve.
        reason: String,
    },

    /// The backend did not answer within its deadline.
    #[error("Backend for {tier} tier timed out after {timeout_ms}ms")]
    BackendTimeout {
        /// Tier whose backend timed out.
        tier: ModelTier,
        /// Deadline that was exceeded.
        timeout_ms: u64,
    },

    /// The backend answered with something unusable.
    #[error("Backend error: {0}")]
    Backend(#[from] CoreError),

    /// The reasoning backend failed or gave an unparseable verdict.
    #[error("Causal analysis failed: {0}")]
    AnalysisFailed(String),

    /// The caller went away before the request completed.
    #[error("Request cancelled")]
    Cancelled,

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An internal invariant was violated, such as the backend permit pool closing.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::BackendTimeout { .. } => "backend_timeout",
            Self::Backend(_) => "backend_error",
            Self::AnalysisFailed(_) => "analysis_failed",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status an outer surface should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::BackendUnavailable { .. } => 503,
            Self::BackendTimeout { .. } => 504,
            Self::Backend(_) | Self::AnalysisFailed(_) => 502,
            Self::Cancelled => 499,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }
}
