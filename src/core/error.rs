use thiserror::Error;

use crate::models::Role;

/// Structural failures that abort a build before any pair is scored
///
/// Per-pair similarity failures never surface here: the aggregator absorbs
/// them as a zero sub-score (see [`SimilarityError`]).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Malformed entity {identity}: missing required attribute `{field}`")]
    MalformedEntity { identity: String, field: &'static str },

    #[error("Entity {identity} does not carry the {expected:?} identity prefix")]
    MisplacedEntity { identity: String, expected: Role },

    #[error("Duplicate identity in input population: {0}")]
    DuplicateIdentity(String),

    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed match table at line {line}: {reason}")]
    TableFormat { line: usize, reason: String },

    #[error("Scoring task for {seeker_id} x {provider_id} failed: {reason}")]
    Worker {
        seeker_id: String,
        provider_id: String,
        reason: String,
    },
}

/// Failure of a single similarity call
#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("Similarity call exceeded {0} ms")]
    Timeout(u64),

    #[error("Embedding backend error: {0}")]
    Backend(String),

    #[error("Embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}
