//! Chunk type and generation modes.
//!
//! Chunks are created by the external document ingester (one per segment of
//! a legal document) and are never deleted by this core. Their vector lives
//! separately in the vector column and starts out absent.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The atomic unit of embeddable text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique, stable chunk identifier
    pub chunk_id: String,

    /// Identifier of the owning document
    pub document_id: String,

    /// Raw text content. `None` when the ingester could not extract any text.
    #[serde(default)]
    pub content: Option<String>,

    /// When the chunk was ingested (milliseconds since epoch for JSON compatibility)
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a chunk with text content
    pub fn new(
        chunk_id: impl Into<String>,
        document_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            document_id: document_id.into(),
            content: Some(content.into()),
            created_at: Utc::now(),
        }
    }

    /// Create a chunk whose text extraction produced nothing
    pub fn without_content(chunk_id: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            document_id: document_id.into(),
            content: None,
            created_at: Utc::now(),
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Which chunks a generation run selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Only chunks whose vector is absent (incremental, non-destructive)
    Pending,
    /// Every chunk; existing vectors are overwritten (full regeneration)
    All,
}

impl GenerationMode {
    /// Whether this mode replaces vectors that already exist
    pub fn overwrites(&self) -> bool {
        matches!(self, GenerationMode::All)
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Pending => write!(f, "pending"),
            GenerationMode::All => write!(f, "all"),
        }
    }
}
