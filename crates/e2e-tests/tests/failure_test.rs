//! Failure isolation E2E tests.
//!
//! A failed batch is recorded and skipped; repeated commit failures are
//! treated as a storage outage; a run where nothing succeeds is an error.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use e2e_tests::{create_test_chunks, run_with, FlakyStore, MockLoader, TestHarness};
use lexvec_indexing::{FailureKind, IndexingError, RunFailure, RunRequest, RunStatus};
use lexvec_types::{Chunk, ModelId};

/// An encode failure costs only its own batch.
#[test]
fn test_encoding_failure_isolated_to_batch() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 6));

    let report = harness.run(
        MockLoader::new().failing_on("Article 3"),
        &RunRequest::pending(ModelId::AllMinilm).with_batch_size(2),
    );

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.processed, 4);
    assert_eq!(report.failed, 2);
    assert_eq!(report.batches_succeeded, 2);
    assert_eq!(report.batches_failed, 1);
    assert!(report
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Encoding));

    let ids: Vec<_> = report.failures.iter().map(|f| f.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["law-1-0002", "law-1-0003"]);
    assert!(harness.storage.get_vector("law-1-0003").unwrap().is_none());
}

/// Commit failures below the outage threshold are recorded per batch and
/// the consecutive counter resets after a success.
#[test]
fn test_persistence_failures_isolated() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 10));

    let store = Arc::new(
        FlakyStore::new(harness.storage.clone()).with_script([true, true, false, true, true]),
    );
    let report = run_with(
        store.clone(),
        MockLoader::new(),
        &RunRequest::pending(ModelId::AllMinilm).with_batch_size(2),
        &CancellationToken::new(),
    );

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.processed, 2);
    assert_eq!(report.batches_succeeded, 1);
    assert_eq!(report.batches_failed, 4);
    assert_eq!(report.failed, 8);
    assert!(report
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Persistence));
    assert_eq!(store.commits(), 1);

    let status = harness.storage.status().unwrap();
    assert_eq!(status.with_vector, 2);
    assert_eq!(status.without_vector, 8);
}

/// Three consecutive commit failures abort the run as a storage outage.
#[test]
fn test_consecutive_commit_failures_abort() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 10));

    let store = Arc::new(FlakyStore::new(harness.storage.clone()).with_script([true; 5]));
    let report = run_with(
        store,
        MockLoader::new(),
        &RunRequest::pending(ModelId::AllMinilm).with_batch_size(2),
        &CancellationToken::new(),
    );

    match &report.status {
        RunStatus::Failed(RunFailure::StorageOutage {
            consecutive_failures,
            last_error,
        }) => {
            assert_eq!(*consecutive_failures, 3);
            assert!(last_error.contains("injected"));
        }
        other => panic!("Expected StorageOutage, got {:?}", other),
    }
    assert_eq!(report.batches_failed, 3);
    assert_eq!(report.processed, 0);
    assert!(harness.vector_snapshot().is_empty());
    assert!(matches!(
        report.into_result(),
        Err(IndexingError::StorageOutage { .. })
    ));
}

/// When no batch produces a vector the run fails as a whole.
#[test]
fn test_no_batch_succeeded() {
    let harness = TestHarness::new();
    harness.seed(&[
        Chunk::without_content("c1", "law-1"),
        Chunk::without_content("c2", "law-1"),
        Chunk::new("c3", "law-1", "\u{064E}"),
    ]);

    let report = harness.run(
        MockLoader::new(),
        &RunRequest::pending(ModelId::Labse).with_batch_size(2),
    );

    assert_eq!(
        report.status,
        RunStatus::Failed(RunFailure::NoBatchSucceeded {
            batches_attempted: 2
        })
    );
    assert_eq!(report.failed, 3);
    assert!(harness.storage.established_dimension().unwrap().is_none());
}

/// Batch size zero is rejected before selection.
#[test]
fn test_zero_batch_size_rejected() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 2));

    let encoder = lexvec_embeddings::Encoder::new(MockLoader::new());
    let mut orchestrator = lexvec_indexing::BatchOrchestrator::new(
        harness.storage.clone(),
        encoder,
        lexvec_indexing::OrchestratorConfig::default(),
    );
    let result = orchestrator.run(
        &RunRequest::pending(ModelId::Labse).with_batch_size(0),
        &CancellationToken::new(),
    );
    assert!(matches!(result, Err(IndexingError::InvalidConfig(_))));
}
