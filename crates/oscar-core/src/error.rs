// Engine error taxonomy.
//
// Sparse data never produces an error here: undersized categories are
// skipped, untrainable categories get zero weights, and unparseable odds
// degrade to probability 0. Only caller bugs surface as errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// `predict` or `analyze_venue_strength` was called before `train`.
    #[error("model must be trained before {operation}")]
    NotTrained { operation: &'static str },
}
