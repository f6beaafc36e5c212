//! Prompt complexity classification.

mod complexity;

pub use complexity::{ComplexityClassifier, ComplexityScore, ComplexitySignals, ComplexityTier};
