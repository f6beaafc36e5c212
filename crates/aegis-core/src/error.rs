use core::result::Result as CoreResult;

use thiserror::Error;

/// Result type for backend operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors a model backend can report.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend could not be reached or refused the request.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer before the deadline.
    #[error("Backend timed out after {elapsed_ms}ms")]
    Timeout {
        /// Time spent waiting before giving up.
        elapsed_ms: u64,
    },

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// The backend returned a payload that could not be interpreted.
    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    /// Backend configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether another backend could plausibly serve the same request.
    ///
    /// Timeouts are not included; a timed-out call may still be billed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::MissingApiKey(_))
    }
}
