//! Hallucination detection for generated responses.

mod analyzer;
/// Claim extraction and lexical support scoring
pub mod claims;

pub use analyzer::CausalAnalyzer;
pub use claims::Claim;
