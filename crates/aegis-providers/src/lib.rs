//! Backend adapters for external LLM services.

/// Scriptable in-process backend for tests and offline runs.
pub mod mock;
/// OpenAI-compatible chat completion backend.
pub mod openai;

pub use mock::{MockBackend, MockFailure};
pub use openai::{OpenAiCompatibleBackend, TokenPricing};
