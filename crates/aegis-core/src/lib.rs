//! Core types and traits for the Aegis gateway.
//!
//! This crate provides the request/response data model, backend error types,
//! and the trait every model backend implements.

/// Error types and result definitions.
pub mod error;
/// Request, decision, and statistics types exchanged with callers.
pub mod response;
/// Synchronization helpers for poisoned locks.
pub mod sync;
/// Trait definitions for model backends.
pub mod traits;
/// Core data types for prompts, tiers, and backend invocations.
pub mod types;

pub use error::{Error, Result};
pub use response::{AggregateStats, CausalAnalysis, LLMResponse, RoutingDecision};
pub use sync::{IgnoreLock, IgnoreRwLock};
pub use traits::ModelBackend;
pub use types::{BackendReply, Invocation, ModelTier, PromptRequest, ValidationError};
