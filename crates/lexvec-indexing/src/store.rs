//! The storage surface the orchestrator and checker depend on.

use lexvec_storage::{BatchCommit, Storage, StorageError, VectorWrite};
use lexvec_types::{Chunk, GenerationMode, ModelId, StoreDimension};

/// Selection and persistence operations over chunks and their vectors.
pub trait VectorStore: Send + Sync {
    /// Chunks a run in `mode` must process
    fn select(&self, mode: GenerationMode) -> Result<Vec<Chunk>, StorageError>;

    fn established_dimension(&self) -> Result<Option<StoreDimension>, StorageError>;

    /// Commit one batch atomically
    fn write_vector_batch(
        &self,
        model: ModelId,
        writes: &[VectorWrite],
    ) -> Result<BatchCommit, StorageError>;

    fn vector_ids(&self) -> Result<Vec<String>, StorageError>;

    fn get_vector_bytes(&self, chunk_id: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn iter_vector_bytes(&self) -> Result<Vec<(String, Vec<u8>)>, StorageError>;

    fn put_checkpoint(&self, job_name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    fn get_checkpoint(&self, job_name: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

impl VectorStore for Storage {
    fn select(&self, mode: GenerationMode) -> Result<Vec<Chunk>, StorageError> {
        match mode {
            GenerationMode::Pending => self.select_pending(),
            GenerationMode::All => self.select_all(),
        }
    }

    fn established_dimension(&self) -> Result<Option<StoreDimension>, StorageError> {
        Storage::established_dimension(self)
    }

    fn write_vector_batch(
        &self,
        model: ModelId,
        writes: &[VectorWrite],
    ) -> Result<BatchCommit, StorageError> {
        Storage::write_vector_batch(self, model, writes)
    }

    fn vector_ids(&self) -> Result<Vec<String>, StorageError> {
        Storage::vector_ids(self)
    }

    fn get_vector_bytes(&self, chunk_id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Storage::get_vector_bytes(self, chunk_id)
    }

    fn iter_vector_bytes(&self) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        Storage::iter_vector_bytes(self)
    }

    fn put_checkpoint(&self, job_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        Storage::put_checkpoint(self, job_name, bytes)
    }

    fn get_checkpoint(&self, job_name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Storage::get_checkpoint(self, job_name)
    }
}
