//! Run reports.

use std::time::Duration;

use lexvec_types::{GenerationMode, ModelId};
use serde::{Deserialize, Serialize};

use crate::error::IndexingError;

/// Why a chunk was not given a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Chunk has no text content
    MissingText,
    /// Text is empty, whitespace-only or otherwise unencodable after normalization
    InvalidText,
    /// The model failed on the chunk's batch
    Encoding,
    /// The chunk's batch could not be committed
    Persistence,
}

/// One chunk left without a new vector, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_id: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Fatal conditions that stop a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunFailure {
    DimensionMismatch {
        established: usize,
        incoming: usize,
        model: ModelId,
    },
    NoBatchSucceeded {
        batches_attempted: usize,
    },
    StorageOutage {
        consecutive_failures: usize,
        last_error: String,
    },
}

impl From<RunFailure> for IndexingError {
    fn from(failure: RunFailure) -> Self {
        match failure {
            RunFailure::DimensionMismatch {
                established,
                incoming,
                model,
            } => IndexingError::DimensionMismatch {
                established,
                incoming,
                model,
            },
            RunFailure::NoBatchSucceeded { batches_attempted } => {
                IndexingError::NoBatchSucceeded { batches_attempted }
            }
            RunFailure::StorageOutage {
                consecutive_failures,
                last_error,
            } => IndexingError::StorageOutage {
                consecutive_failures,
                last_error,
            },
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Stopped at a batch boundary on request
    Cancelled { batches_completed: usize },
    Failed(RunFailure),
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Cancelled { .. } => "cancelled",
            RunStatus::Failed(_) => "failed",
        }
    }
}

/// Summary of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: GenerationMode,
    pub model: ModelId,
    /// Chunks chosen by the selection query
    pub selected: usize,
    /// Chunks whose new vector was committed
    pub processed: usize,
    /// Chunks recorded as failures
    pub failed: usize,
    pub batches_total: usize,
    pub batches_succeeded: usize,
    pub batches_failed: usize,
    pub elapsed_ms: u64,
    /// Committed vectors per second
    pub throughput_per_sec: f64,
    pub failures: Vec<ChunkFailure>,
    pub status: RunStatus,
}

impl RunReport {
    pub fn new(mode: GenerationMode, model: ModelId, selected: usize, batches_total: usize) -> Self {
        Self {
            mode,
            model,
            selected,
            processed: 0,
            failed: 0,
            batches_total,
            batches_succeeded: 0,
            batches_failed: 0,
            elapsed_ms: 0,
            throughput_per_sec: 0.0,
            failures: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    pub fn record_failure(
        &mut self,
        chunk_id: impl Into<String>,
        kind: FailureKind,
        reason: impl Into<String>,
    ) {
        self.failures.push(ChunkFailure {
            chunk_id: chunk_id.into(),
            kind,
            reason: reason.into(),
        });
        self.failed += 1;
    }

    /// Stamp elapsed time and throughput
    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis() as u64;
        let secs = elapsed.as_secs_f64();
        self.throughput_per_sec = if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        };
    }

    /// Share of selected chunks that received a vector, 0-100
    pub fn completion_pct(&self) -> f64 {
        if self.selected == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.selected as f64
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, RunStatus::Failed(_))
    }

    /// Turn a failed run into its error, keeping successful and cancelled
    /// runs as reports.
    pub fn into_result(self) -> Result<RunReport, IndexingError> {
        match self.status {
            RunStatus::Failed(failure) => Err(failure.into()),
            _ => Ok(self),
        }
    }
}
