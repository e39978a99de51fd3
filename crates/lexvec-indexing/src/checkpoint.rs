//! Last-run checkpoint.
//!
//! The summary of the most recent generation run is persisted so `status`
//! can show it without re-running anything. Per-chunk failures are not kept.

use chrono::{DateTime, Utc};
use lexvec_types::{GenerationMode, ModelId};
use serde::{Deserialize, Serialize};

use crate::error::IndexingError;
use crate::report::{RunReport, RunStatus};
use crate::store::VectorStore;

/// Checkpoint name for the last generation run
pub const LAST_RUN_CHECKPOINT: &str = "embedding_last_run";

/// Persisted summary of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCheckpoint {
    pub mode: GenerationMode,
    pub model: ModelId,
    pub status: RunStatus,
    pub selected: usize,
    pub processed: usize,
    pub failed: usize,
    pub batches_succeeded: usize,
    pub batches_failed: usize,
    pub elapsed_ms: u64,

    /// When the run finished (milliseconds since epoch for JSON compatibility)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,
}

impl RunCheckpoint {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            mode: report.mode,
            model: report.model,
            status: report.status.clone(),
            selected: report.selected,
            processed: report.processed,
            failed: report.failed,
            batches_succeeded: report.batches_succeeded,
            batches_failed: report.batches_failed,
            elapsed_ms: report.elapsed_ms,
            finished_at: Utc::now(),
        }
    }

    /// Serialize to JSON bytes for storage
    pub fn to_bytes(&self) -> Result<Vec<u8>, IndexingError> {
        serde_json::to_vec(self).map_err(IndexingError::from)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexingError> {
        serde_json::from_slice(bytes).map_err(IndexingError::from)
    }

    pub fn save<S: VectorStore + ?Sized>(&self, store: &S) -> Result<(), IndexingError> {
        store.put_checkpoint(LAST_RUN_CHECKPOINT, &self.to_bytes()?)?;
        Ok(())
    }

    pub fn load<S: VectorStore + ?Sized>(store: &S) -> Result<Option<Self>, IndexingError> {
        match store.get_checkpoint(LAST_RUN_CHECKPOINT)? {
            Some(bytes) => Ok(Some(Self::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexvec_storage::Storage;
    use tempfile::TempDir;

    #[test]
    fn test_checkpoint_serialization() {
        let mut report = RunReport::new(GenerationMode::Pending, ModelId::Labse, 4, 1);
        report.processed = 3;
        report.record_failure("c9", crate::report::FailureKind::MissingText, "no text");

        let checkpoint = RunCheckpoint::from_report(&report);
        let decoded = RunCheckpoint::from_bytes(&checkpoint.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded.model, ModelId::Labse);
        assert_eq!(decoded.processed, 3);
        assert_eq!(decoded.failed, 1);
        assert_eq!(decoded.status, RunStatus::Completed);
        assert_eq!(
            decoded.finished_at.timestamp_millis(),
            checkpoint.finished_at.timestamp_millis()
        );
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();
        assert!(RunCheckpoint::load(&storage).unwrap().is_none());

        let report = RunReport::new(GenerationMode::All, ModelId::AllMinilm, 0, 0);
        RunCheckpoint::from_report(&report).save(&storage).unwrap();

        let loaded = RunCheckpoint::load(&storage).unwrap().unwrap();
        assert_eq!(loaded.mode, GenerationMode::All);
    }
}
