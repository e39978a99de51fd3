//! Embedding error types.

use lexvec_types::ModelId;
use thiserror::Error;

/// Errors that can occur during model loading and encoding.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Candle model error
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Tokenizer error
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Model file not found or unreadable
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Download error
    #[error("Failed to download model: {0}")]
    Download(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encode requested while no model is loaded
    #[error("No embedding model is loaded")]
    NotLoaded,

    /// An input text cannot be encoded
    #[error("Invalid input at position {index}: {reason}")]
    InvalidInput { index: usize, reason: String },

    /// Model output disagrees with the registry's declared dimension
    #[error("Dimension mismatch for {model}: declared {expected}, model produced {actual}")]
    DimensionMismatch {
        model: ModelId,
        expected: usize,
        actual: usize,
    },

    /// Model returned a different number of vectors than texts given
    #[error("Model returned {actual} vectors for {expected} texts")]
    OutputCount { expected: usize, actual: usize },
}
