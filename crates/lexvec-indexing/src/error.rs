//! Error types for batch generation and audits.

use lexvec_embeddings::EmbeddingError;
use lexvec_storage::StorageError;
use lexvec_types::{LexvecError, ModelId};
use thiserror::Error;

/// Errors that can occur while generating or auditing vectors
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Model loading or encoding failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Registry or codec error
    #[error(transparent)]
    Types(#[from] LexvecError),

    /// Run parameters rejected before any work
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// New vectors disagree with the store's established dimension
    #[error(
        "Dimension mismatch: store holds {established}-dim vectors, model {model} produces {incoming}. \
         Clear all vectors before switching to a model with a different dimension"
    )]
    DimensionMismatch {
        established: usize,
        incoming: usize,
        model: ModelId,
    },

    /// Every attempted batch failed
    #[error("No batch succeeded ({batches_attempted} attempted)")]
    NoBatchSucceeded { batches_attempted: usize },

    /// Too many consecutive batch commits failed
    #[error("Storage outage: {consecutive_failures} consecutive batch commits failed, last error: {last_error}")]
    StorageOutage {
        consecutive_failures: usize,
        last_error: String,
    },
}

impl From<serde_json::Error> for IndexingError {
    fn from(err: serde_json::Error) -> Self {
        IndexingError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexingError::NoBatchSucceeded {
            batches_attempted: 3,
        };
        assert_eq!(err.to_string(), "No batch succeeded (3 attempted)");

        let err = IndexingError::DimensionMismatch {
            established: 768,
            incoming: 384,
            model: ModelId::AllMinilm,
        };
        assert!(err.to_string().starts_with(
            "Dimension mismatch: store holds 768-dim vectors, model all-minilm produces 384"
        ));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: IndexingError = json_err.into();
        assert!(matches!(err, IndexingError::Serialization(_)));
    }
}
