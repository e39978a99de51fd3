//! Error types shared across the lexvec crates.

use thiserror::Error;

/// Unified error type for domain-level operations.
#[derive(Debug, Error)]
pub enum LexvecError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested model identifier is not in the registry
    #[error("Unknown model '{requested}' (expected one of: {known})")]
    UnknownModel { requested: String, known: String },

    /// Stored vector bytes could not be decoded
    #[error("Vector codec error: {0}")]
    Codec(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
