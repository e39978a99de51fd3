//! RocksDB wrapper for lexvec storage.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Idempotent chunk writes with a per-document index
//! - Selection of all, pending, and per-document chunks
//! - Atomic per-batch vector commits guarded by the established dimension

use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use lexvec_types::{Chunk, ModelId, StoreDimension, VectorRecord};

use crate::column_families::{
    build_cf_descriptors, CF_CHECKPOINTS, CF_CHUNKS, CF_DOC_CHUNKS, CF_STORE_META, CF_VECTORS,
};
use crate::error::StorageError;
use crate::keys::{validate_id, CheckpointKey, DocChunkKey, ESTABLISHED_DIMENSION_KEY};

/// One chunk's new vector inside a batch commit
#[derive(Debug, Clone, PartialEq)]
pub struct VectorWrite {
    pub chunk_id: String,
    pub values: Vec<f32>,
}

impl VectorWrite {
    pub fn new(chunk_id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            values,
        }
    }
}

/// Outcome of a committed vector batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCommit {
    /// Vectors written
    pub written: usize,
    /// True when this commit established the store's dimension
    pub established: bool,
}

/// Read-only completion summary of the vector column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    pub total_chunks: u64,
    pub with_vector: u64,
    pub without_vector: u64,
    /// Share of chunks with a vector, 0-100. An empty store reports 100.
    pub completion_pct: f64,
    pub established: Option<StoreDimension>,
}

/// Main storage interface for lexvec
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    // ==================== Chunk Methods ====================

    /// Store a chunk together with its document index entry.
    ///
    /// Idempotent: returns false and leaves the stored chunk untouched when
    /// the chunk id already exists.
    pub fn put_chunk(&self, chunk: &Chunk) -> Result<bool, StorageError> {
        validate_id("chunk", &chunk.chunk_id)?;
        validate_id("document", &chunk.document_id)?;

        let chunks_cf = self.cf(CF_CHUNKS)?;
        let doc_cf = self.cf(CF_DOC_CHUNKS)?;

        if self
            .db
            .get_pinned_cf(chunks_cf, chunk.chunk_id.as_bytes())?
            .is_some()
        {
            debug!(chunk_id = %chunk.chunk_id, "Chunk already exists, skipping");
            return Ok(false);
        }

        let doc_key = DocChunkKey::new(&chunk.document_id, &chunk.chunk_id);

        let mut batch = WriteBatch::default();
        batch.put_cf(chunks_cf, chunk.chunk_id.as_bytes(), chunk.to_bytes()?);
        batch.put_cf(doc_cf, doc_key.to_bytes(), b"");
        self.db.write(batch)?;

        debug!(chunk_id = %chunk.chunk_id, document_id = %chunk.document_id, "Stored chunk");
        Ok(true)
    }

    /// Store many chunks. Returns how many were newly created.
    pub fn put_chunks(&self, chunks: &[Chunk]) -> Result<usize, StorageError> {
        let mut created = 0;
        for chunk in chunks {
            if self.put_chunk(chunk)? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Get a chunk by id
    pub fn get_chunk(&self, chunk_id: &str) -> Result<Option<Chunk>, StorageError> {
        let cf = self.cf(CF_CHUNKS)?;
        match self.db.get_pinned_cf(cf, chunk_id.as_bytes())? {
            Some(bytes) => Ok(Some(Chunk::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every chunk, ordered by chunk id
    pub fn select_all(&self) -> Result<Vec<Chunk>, StorageError> {
        self.scan_chunks(|_| Ok(true))
    }

    /// Chunks with no stored vector, ordered by chunk id
    pub fn select_pending(&self) -> Result<Vec<Chunk>, StorageError> {
        let vectors_cf = self.cf(CF_VECTORS)?;
        self.scan_chunks(|chunk_id| {
            Ok(self.db.get_pinned_cf(vectors_cf, chunk_id)?.is_none())
        })
    }

    /// Chunks belonging to one document, ordered by chunk id
    pub fn select_by_document(&self, document_id: &str) -> Result<Vec<Chunk>, StorageError> {
        let doc_cf = self.cf(CF_DOC_CHUNKS)?;
        let prefix = DocChunkKey::prefix(document_id);

        let mut chunks = Vec::new();
        let iter = self
            .db
            .iterator_cf(doc_cf, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let doc_key = DocChunkKey::from_bytes(&key)?;
            match self.get_chunk(&doc_key.chunk_id)? {
                Some(chunk) => chunks.push(chunk),
                None => warn!(
                    document_id = %document_id,
                    chunk_id = %doc_key.chunk_id,
                    "Document index points at a missing chunk"
                ),
            }
        }
        Ok(chunks)
    }

    fn scan_chunks<F>(&self, mut keep: F) -> Result<Vec<Chunk>, StorageError>
    where
        F: FnMut(&[u8]) -> Result<bool, StorageError>,
    {
        let cf = self.cf(CF_CHUNKS)?;
        let mut chunks = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            if keep(&key[..])? {
                chunks.push(Chunk::from_bytes(&value)?);
            }
        }
        Ok(chunks)
    }

    // ==================== Vector Methods ====================

    /// Commit one batch of vectors atomically.
    ///
    /// All vectors must share one dimension and target existing chunks. The
    /// established dimension is re-read here; a conflicting batch is rejected
    /// with nothing written. The first batch into an empty column records
    /// the established dimension in the same write.
    pub fn write_vector_batch(
        &self,
        model: ModelId,
        writes: &[VectorWrite],
    ) -> Result<BatchCommit, StorageError> {
        let Some(first) = writes.first() else {
            return Ok(BatchCommit {
                written: 0,
                established: false,
            });
        };

        let incoming = first.values.len();
        if incoming == 0 {
            return Err(StorageError::InvalidBatch("vector is empty".to_string()));
        }
        if let Some(odd) = writes.iter().find(|w| w.values.len() != incoming) {
            return Err(StorageError::InvalidBatch(format!(
                "chunk {} has {} values, batch dimension is {}",
                odd.chunk_id,
                odd.values.len(),
                incoming
            )));
        }

        let established = self.established_dimension()?;
        if let Some(existing) = &established {
            if existing.dimension != incoming {
                return Err(StorageError::DimensionConflict {
                    established: existing.dimension,
                    incoming,
                });
            }
        }

        let chunks_cf = self.cf(CF_CHUNKS)?;
        let vectors_cf = self.cf(CF_VECTORS)?;
        let meta_cf = self.cf(CF_STORE_META)?;

        let mut batch = WriteBatch::default();
        for write in writes {
            if self
                .db
                .get_pinned_cf(chunks_cf, write.chunk_id.as_bytes())?
                .is_none()
            {
                return Err(StorageError::NotFound(write.chunk_id.clone()));
            }
            let record = VectorRecord::new(model, write.values.clone());
            batch.put_cf(vectors_cf, write.chunk_id.as_bytes(), record.to_bytes());
        }

        let establishes = established.is_none();
        if establishes {
            let dimension = StoreDimension::new(incoming, model);
            batch.put_cf(meta_cf, ESTABLISHED_DIMENSION_KEY, dimension.to_bytes()?);
        }

        self.db.write(batch)?;

        if establishes {
            info!(dimension = incoming, model = %model, "Established vector dimension");
        }
        debug!(count = writes.len(), dimension = incoming, "Committed vector batch");

        Ok(BatchCommit {
            written: writes.len(),
            established: establishes,
        })
    }

    /// Get and decode a chunk's stored vector
    pub fn get_vector(&self, chunk_id: &str) -> Result<Option<VectorRecord>, StorageError> {
        match self.get_vector_bytes(chunk_id)? {
            Some(bytes) => Ok(Some(VectorRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Raw stored bytes of a chunk's vector
    pub fn get_vector_bytes(&self, chunk_id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(CF_VECTORS)?;
        Ok(self.db.get_cf(cf, chunk_id.as_bytes())?)
    }

    /// Chunk ids that currently have a vector
    pub fn vector_ids(&self) -> Result<Vec<String>, StorageError> {
        let cf = self.cf(CF_VECTORS)?;
        let mut ids = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            ids.push(key_to_id(&key)?);
        }
        Ok(ids)
    }

    /// Every stored vector as (chunk id, raw bytes), ordered by chunk id
    pub fn iter_vector_bytes(&self) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let cf = self.cf(CF_VECTORS)?;
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            entries.push((key_to_id(&key)?, value.to_vec()));
        }
        Ok(entries)
    }

    /// The store's established dimension, if any vector was ever committed
    pub fn established_dimension(&self) -> Result<Option<StoreDimension>, StorageError> {
        let cf = self.cf(CF_STORE_META)?;
        match self.db.get_pinned_cf(cf, ESTABLISHED_DIMENSION_KEY)? {
            Some(bytes) => Ok(Some(StoreDimension::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove every vector and the established dimension in one write.
    ///
    /// Chunks are kept, so every chunk becomes pending again. Returns the
    /// number of vectors removed.
    pub fn clear_vectors(&self) -> Result<usize, StorageError> {
        let vectors_cf = self.cf(CF_VECTORS)?;
        let meta_cf = self.cf(CF_STORE_META)?;

        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for item in self.db.iterator_cf(vectors_cf, IteratorMode::Start) {
            let (key, _) = item?;
            batch.delete_cf(vectors_cf, key);
            removed += 1;
        }
        batch.delete_cf(meta_cf, ESTABLISHED_DIMENSION_KEY);
        self.db.write(batch)?;

        info!(removed, "Cleared all vectors");
        Ok(removed)
    }

    /// Completion counts for the vector column
    pub fn status(&self) -> Result<StoreStatus, StorageError> {
        let total_chunks = self.count_cf_entries(self.cf(CF_CHUNKS)?)?;
        let with_vector = self.count_cf_entries(self.cf(CF_VECTORS)?)?;
        let without_vector = total_chunks.saturating_sub(with_vector);
        let completion_pct = if total_chunks == 0 {
            100.0
        } else {
            with_vector as f64 * 100.0 / total_chunks as f64
        };

        Ok(StoreStatus {
            total_chunks,
            with_vector,
            without_vector,
            completion_pct,
            established: self.established_dimension()?,
        })
    }

    fn count_cf_entries(&self, cf: &ColumnFamily) -> Result<u64, StorageError> {
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    // ==================== Checkpoint Methods ====================

    /// Store a named checkpoint
    pub fn put_checkpoint(
        &self,
        job_name: &str,
        checkpoint_bytes: &[u8],
    ) -> Result<(), StorageError> {
        let cf = self.cf(CF_CHECKPOINTS)?;
        let key = CheckpointKey::new(job_name);
        self.db.put_cf(cf, key.to_bytes(), checkpoint_bytes)?;
        Ok(())
    }

    /// Get a named checkpoint
    pub fn get_checkpoint(&self, job_name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(CF_CHECKPOINTS)?;
        let key = CheckpointKey::new(job_name);
        Ok(self.db.get_cf(cf, key.to_bytes())?)
    }

    /// Flush all memtables to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

fn key_to_id(key: &[u8]) -> Result<String, StorageError> {
    std::str::from_utf8(key)
        .map(str::to_string)
        .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))
}
