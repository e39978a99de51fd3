//! Batch orchestrator.
//!
//! Selects chunks for a run, then processes them in fixed-size batches:
//! normalize and validate text, encode, check dimensions, commit. Batches run
//! one after another on a single encoder. Cancellation is honoured between
//! batches only, so a started batch always finishes or fails as a unit.

use std::sync::Arc;
use std::time::Instant;

use lexvec_embeddings::{normalize, validate_text, EmbeddingError, Encoder, ModelLoader};
use lexvec_storage::{StorageError, VectorWrite};
use lexvec_types::{Chunk, GenerationConfig, GenerationMode, ModelId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::checkpoint::RunCheckpoint;
use crate::error::IndexingError;
use crate::guard::{self, DimensionGuard, GuardOutcome};
use crate::report::{FailureKind, RunFailure, RunReport, RunStatus};
use crate::store::VectorStore;

/// Default chunks per persisted batch
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// What a single run should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub mode: GenerationMode,
    pub model: ModelId,
    pub batch_size: usize,
}

impl RunRequest {
    pub fn new(mode: GenerationMode, model: ModelId) -> Self {
        Self {
            mode,
            model,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Encode only chunks without a vector
    pub fn pending(model: ModelId) -> Self {
        Self::new(GenerationMode::Pending, model)
    }

    /// Re-encode every chunk, overwriting existing vectors
    pub fn all(model: ModelId) -> Self {
        Self::new(GenerationMode::All, model)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Consecutive failed commits after which the run is treated as a
    /// storage outage and aborted
    pub max_consecutive_persist_failures: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_consecutive_persist_failures: 3,
        }
    }
}

impl From<&GenerationConfig> for OrchestratorConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_consecutive_persist_failures: config.max_consecutive_persist_failures,
        }
    }
}

/// A chunk ready for encoding
struct Prepared {
    chunk_id: String,
    text: String,
}

/// Drives generation runs against one store with one encoder.
pub struct BatchOrchestrator<S, L> {
    store: Arc<S>,
    encoder: Encoder<L>,
    config: OrchestratorConfig,
}

impl<S: VectorStore, L: ModelLoader> BatchOrchestrator<S, L> {
    pub fn new(store: Arc<S>, encoder: Encoder<L>, config: OrchestratorConfig) -> Self {
        Self {
            store,
            encoder,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn encoder(&self) -> &Encoder<L> {
        &self.encoder
    }

    /// Execute one run and return its report.
    ///
    /// Errors are reserved for problems before batching starts: bad
    /// parameters, a failed selection query, or a model that cannot be
    /// loaded. Failures during batching end up in the report's status. The
    /// model is released when the run returns, whatever the outcome.
    pub fn run(
        &mut self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunReport, IndexingError> {
        let result = self.execute(request, cancel);
        self.encoder.unload();
        let report = result?;

        if let Err(e) = RunCheckpoint::from_report(&report).save(self.store.as_ref()) {
            warn!(error = %e, "Failed to record run checkpoint");
        }

        info!(
            mode = %report.mode,
            model = %report.model,
            status = report.status.label(),
            selected = report.selected,
            processed = report.processed,
            failed = report.failed,
            elapsed_ms = report.elapsed_ms,
            throughput_per_sec = report.throughput_per_sec,
            "Generation run finished"
        );
        Ok(report)
    }

    fn execute(
        &mut self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunReport, IndexingError> {
        if request.batch_size == 0 {
            return Err(IndexingError::InvalidConfig(
                "batch_size must be > 0".to_string(),
            ));
        }

        let started = Instant::now();
        let descriptor = request.model.descriptor();

        let chunks = self.store.select(request.mode)?;
        let batches_total = chunks.len().div_ceil(request.batch_size);
        let mut report = RunReport::new(request.mode, request.model, chunks.len(), batches_total);

        info!(
            mode = %request.mode,
            model = %request.model,
            selected = chunks.len(),
            batches = batches_total,
            "Starting generation run"
        );

        if chunks.is_empty() {
            report.finish(started.elapsed());
            return Ok(report);
        }

        let established = self
            .store
            .established_dimension()?
            .map(|d| d.dimension);

        // Cheap check against the declared dimension before paying for a load
        if let Err(violation) = guard::check(established, descriptor.dimension) {
            error!(
                established = violation.established,
                incoming = violation.incoming,
                model = %request.model,
                "Model dimension does not match the store, aborting"
            );
            report.status = RunStatus::Failed(RunFailure::DimensionMismatch {
                established: violation.established,
                incoming: violation.incoming,
                model: request.model,
            });
            report.finish(started.elapsed());
            return Ok(report);
        }

        self.encoder.load(descriptor)?;

        let mut dimension_guard = DimensionGuard::new(established);
        let mut consecutive_persist_failures = 0usize;

        for (index, batch) in chunks.chunks(request.batch_size).enumerate() {
            if cancel.is_cancelled() {
                info!(batches_completed = index, "Cancellation requested, stopping");
                report.status = RunStatus::Cancelled {
                    batches_completed: index,
                };
                break;
            }

            let prepared = prepare_batch(batch, &mut report);
            if prepared.is_empty() {
                warn!(batch = index + 1, "Batch has no encodable chunks");
                report.batches_failed += 1;
                continue;
            }

            let texts: Vec<&str> = prepared.iter().map(|p| p.text.as_str()).collect();
            let embeddings = match self.encoder.encode_many(&texts) {
                Ok(embeddings) => embeddings,
                Err(EmbeddingError::DimensionMismatch {
                    expected, actual, ..
                }) => {
                    let established = dimension_guard.established().unwrap_or(expected);
                    error!(
                        batch = index + 1,
                        established,
                        incoming = actual,
                        "Model output changed dimension mid-run, aborting"
                    );
                    report.status = RunStatus::Failed(RunFailure::DimensionMismatch {
                        established,
                        incoming: actual,
                        model: request.model,
                    });
                    break;
                }
                Err(e) => {
                    warn!(batch = index + 1, error = %e, "Batch failed to encode");
                    for p in &prepared {
                        report.record_failure(&p.chunk_id, FailureKind::Encoding, e.to_string());
                    }
                    report.batches_failed += 1;
                    continue;
                }
            };

            let outcome = match dimension_guard.check_batch(&embeddings) {
                Ok(outcome) => outcome,
                Err(violation) => {
                    error!(
                        batch = index + 1,
                        established = violation.established,
                        incoming = violation.incoming,
                        "Dimension guard rejected batch, aborting run"
                    );
                    report.status = RunStatus::Failed(RunFailure::DimensionMismatch {
                        established: violation.established,
                        incoming: violation.incoming,
                        model: request.model,
                    });
                    break;
                }
            };

            let writes: Vec<VectorWrite> = prepared
                .into_iter()
                .zip(embeddings)
                .map(|(p, e)| VectorWrite::new(p.chunk_id, e.into_values()))
                .collect();

            match self.store.write_vector_batch(request.model, &writes) {
                Ok(commit) => {
                    if outcome == GuardOutcome::Establishes {
                        dimension_guard.commit(descriptor.dimension);
                    }
                    consecutive_persist_failures = 0;
                    report.processed += commit.written;
                    report.batches_succeeded += 1;
                    debug!(
                        batch = index + 1,
                        of = batches_total,
                        written = commit.written,
                        "Batch committed"
                    );
                }
                Err(StorageError::DimensionConflict {
                    established,
                    incoming,
                }) => {
                    error!(
                        batch = index + 1,
                        established, incoming, "Store rejected batch dimension, aborting run"
                    );
                    report.status = RunStatus::Failed(RunFailure::DimensionMismatch {
                        established,
                        incoming,
                        model: request.model,
                    });
                    break;
                }
                Err(e) => {
                    consecutive_persist_failures += 1;
                    warn!(
                        batch = index + 1,
                        consecutive = consecutive_persist_failures,
                        error = %e,
                        "Batch commit failed"
                    );
                    for w in &writes {
                        report.record_failure(&w.chunk_id, FailureKind::Persistence, e.to_string());
                    }
                    report.batches_failed += 1;

                    if consecutive_persist_failures >= self.config.max_consecutive_persist_failures {
                        error!(
                            consecutive = consecutive_persist_failures,
                            "Too many consecutive commit failures, aborting run"
                        );
                        report.status = RunStatus::Failed(RunFailure::StorageOutage {
                            consecutive_failures: consecutive_persist_failures,
                            last_error: e.to_string(),
                        });
                        break;
                    }
                }
            }
        }

        if report.status == RunStatus::Completed && report.batches_succeeded == 0 {
            report.status = RunStatus::Failed(RunFailure::NoBatchSucceeded {
                batches_attempted: report.batches_failed,
            });
        }

        report.finish(started.elapsed());
        Ok(report)
    }
}

/// Normalize and validate a batch's texts. Chunks that cannot be encoded
/// are recorded in the report and left out.
fn prepare_batch(batch: &[Chunk], report: &mut RunReport) -> Vec<Prepared> {
    let mut prepared = Vec::with_capacity(batch.len());
    for chunk in batch {
        let Some(content) = chunk.content.as_deref() else {
            report.record_failure(&chunk.chunk_id, FailureKind::MissingText, "chunk has no text");
            continue;
        };
        let text = normalize(content);
        if let Err(reason) = validate_text(&text) {
            report.record_failure(&chunk.chunk_id, FailureKind::InvalidText, reason);
            continue;
        }
        prepared.push(Prepared {
            chunk_id: chunk.chunk_id.clone(),
            text,
        });
    }
    prepared
}
