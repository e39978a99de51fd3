//! # lexvec-indexing
//!
//! Batch embedding generation for lexvec.
//!
//! This crate turns stored chunks into stored vectors and keeps the vector
//! column consistent:
//! - [`BatchOrchestrator`]: pending and full-overwrite runs in atomic batches
//! - [`DimensionGuard`]: one dimensionality per store, mismatches are fatal
//! - [`QualityChecker`]: read-only audit of stored vectors
//! - [`RunCheckpoint`]: summary of the last run, persisted for `status`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lexvec_embeddings::{CandleLoader, Encoder};
//! use lexvec_indexing::{BatchOrchestrator, OrchestratorConfig, RunRequest};
//! use lexvec_storage::Storage;
//! use lexvec_types::ModelId;
//! use tokio_util::sync::CancellationToken;
//!
//! let storage = Arc::new(Storage::open(std::path::Path::new("/tmp/lexvec")).unwrap());
//! let encoder = Encoder::new(CandleLoader::default());
//! let mut orchestrator = BatchOrchestrator::new(storage, encoder, OrchestratorConfig::default());
//! let report = orchestrator
//!     .run(&RunRequest::pending(ModelId::Labse), &CancellationToken::new())
//!     .unwrap();
//! println!("processed {} of {}", report.processed, report.selected);
//! ```

pub mod audit;
pub mod checkpoint;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod report;
pub mod store;

pub use audit::{inspect, AuditFinding, AuditIssue, AuditReport, AuditScope, QualityChecker};
pub use checkpoint::{RunCheckpoint, LAST_RUN_CHECKPOINT};
pub use error::IndexingError;
pub use guard::{DimensionGuard, DimensionViolation, GuardOutcome};
pub use orchestrator::{BatchOrchestrator, OrchestratorConfig, RunRequest, DEFAULT_BATCH_SIZE};
pub use report::{ChunkFailure, FailureKind, RunFailure, RunReport, RunStatus};
pub use store::VectorStore;
