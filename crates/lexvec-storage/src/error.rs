//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Chunk not found
    #[error("Chunk not found: {0}")]
    NotFound(String),

    /// A vector write disagrees with the store's established dimension
    #[error("Dimension conflict: store holds {established}-dim vectors, batch has {incoming}")]
    DimensionConflict { established: usize, incoming: usize },

    /// Batch rejected before anything was written
    #[error("Invalid vector batch: {0}")]
    InvalidBatch(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<lexvec_types::LexvecError> for StorageError {
    fn from(err: lexvec_types::LexvecError) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
