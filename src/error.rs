//! Error types for tessera.

use thiserror::Error;

/// Errors surfaced by validation. Everything past validation is total.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TesseraError {
    /// The collection holds no embeddings.
    #[error("collection is empty")]
    EmptyCollection,

    /// Two vectors being compared have different lengths.
    #[error("dimension mismatch: expected {expected} dimensions, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// NaN or ±Infinity inside an embedding.
    #[error("non-finite value in `{key}` at component {index}")]
    NonFinite { key: String, index: usize },

    /// A key present in the original collection is missing from its counterpart.
    #[error("key `{0}` is missing from the compressed collection")]
    MissingKey(String),

    /// A key appeared twice where uniqueness was required.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Invalid parameter value (non-positive step, empty range, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, TesseraError>;
