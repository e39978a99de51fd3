//! Key encoding and decoding for storage layer.
//!
//! Chunks and vectors are keyed by the raw chunk id. The document index uses
//! `{document_id}\0{chunk_id}` so a prefix scan over `{document_id}\0`
//! returns exactly that document's chunks.

use crate::error::StorageError;

/// Metadata key holding the established vector dimension
pub const ESTABLISHED_DIMENSION_KEY: &[u8] = b"established_dimension";

const DOC_SEPARATOR: char = '\0';

/// Key for the document -> chunk index
/// Format: {document_id}\0{chunk_id}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocChunkKey {
    pub document_id: String,
    pub chunk_id: String,
}

impl DocChunkKey {
    pub fn new(document_id: impl Into<String>, chunk_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            chunk_id: chunk_id.into(),
        }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}{}{}", self.document_id, DOC_SEPARATOR, self.chunk_id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let (document_id, chunk_id) = s
            .split_once(DOC_SEPARATOR)
            .ok_or_else(|| StorageError::Key(format!("Invalid doc chunk key: {:?}", s)))?;
        Ok(Self::new(document_id, chunk_id))
    }

    /// Scan prefix covering every chunk of one document
    pub fn prefix(document_id: &str) -> Vec<u8> {
        format!("{}{}", document_id, DOC_SEPARATOR).into_bytes()
    }
}

/// Key for checkpoint entries
/// Format: checkpoint:{job_name}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointKey {
    /// Job name (e.g., "embedding_last_run")
    pub job_name: String,
}

impl CheckpointKey {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("checkpoint:{}", self.job_name).into_bytes()
    }
}

/// Validate a chunk or document identifier before it becomes part of a key
pub fn validate_id(kind: &str, id: &str) -> Result<(), StorageError> {
    if id.is_empty() {
        return Err(StorageError::Key(format!("{} id is empty", kind)));
    }
    if id.contains(DOC_SEPARATOR) {
        return Err(StorageError::Key(format!("{} id contains NUL: {:?}", kind, id)));
    }
    Ok(())
}
