//! Dimension consistency E2E tests.
//!
//! A store holds vectors of exactly one dimensionality. Switching to a model
//! with a different output size must abort before anything is mutated; the
//! supported path is clearing the vector column and regenerating.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use e2e_tests::{create_test_chunks, run_with, FlakyStore, MockLoader, TestHarness};
use lexvec_embeddings::{EmbeddingError, Encoder};
use lexvec_indexing::{
    BatchOrchestrator, IndexingError, OrchestratorConfig, RunFailure, RunRequest, RunStatus,
};
use lexvec_types::ModelId;

/// Overwrite with a 768-dim model on a 384-dim store aborts with zero
/// mutations and without paying for a model load.
#[test]
fn test_different_dimension_aborts_without_mutation() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 12));
    harness.run(MockLoader::new(), &RunRequest::pending(ModelId::MultilingualMinilm));
    let before = harness.vector_snapshot();

    let loader = MockLoader::new();
    let stats = loader.stats();
    let report = harness.run(loader, &RunRequest::all(ModelId::Labse));

    assert_eq!(
        report.status,
        RunStatus::Failed(RunFailure::DimensionMismatch {
            established: 384,
            incoming: 768,
            model: ModelId::Labse,
        })
    );
    assert_eq!(report.processed, 0);
    assert_eq!(stats.loads(), 0);
    assert_eq!(harness.vector_snapshot(), before);

    let established = harness.storage.established_dimension().unwrap().unwrap();
    assert_eq!(established.dimension, 384);
    assert_eq!(established.model, ModelId::MultilingualMinilm);

    match report.into_result() {
        Err(IndexingError::DimensionMismatch {
            established,
            incoming,
            ..
        }) => {
            assert_eq!((established, incoming), (384, 768));
        }
        other => panic!("Expected DimensionMismatch, got {:?}", other),
    }
}

/// A pending run with a mismatched model is rejected the same way.
#[test]
fn test_pending_run_with_mismatched_model_rejected() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 4));
    harness.run(MockLoader::new(), &RunRequest::pending(ModelId::Arabert));

    harness.seed(&create_test_chunks("law-2", 4));
    let report = harness.run(MockLoader::new(), &RunRequest::pending(ModelId::AllMinilm));

    assert!(!report.is_success());
    assert_eq!(harness.storage.status().unwrap().without_vector, 4);
}

/// Models sharing a dimensionality may write into the same store.
#[test]
fn test_same_dimension_model_accepted() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 4));
    harness.run(MockLoader::new(), &RunRequest::pending(ModelId::Labse));

    let report = harness.run(MockLoader::new(), &RunRequest::all(ModelId::Arabert));
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.processed, 4);

    let record = harness.storage.get_vector("law-1-0000").unwrap().unwrap();
    assert_eq!(record.model, ModelId::Arabert);
}

/// Switching models: clear the vector column, then regenerate.
#[test]
fn test_clear_then_regenerate_with_new_model() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 10));
    harness.run(MockLoader::new(), &RunRequest::pending(ModelId::AllMinilm));

    let removed = harness.storage.clear_vectors().unwrap();
    assert_eq!(removed, 10);
    let status = harness.storage.status().unwrap();
    assert_eq!(status.without_vector, 10);
    assert!(status.established.is_none());

    let report = harness.run(MockLoader::new(), &RunRequest::pending(ModelId::Labse));
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.processed, 10);

    let established = harness.storage.established_dimension().unwrap().unwrap();
    assert_eq!(established.dimension, 768);
    assert_eq!(established.model, ModelId::Labse);
    for (_, bytes) in harness.vector_snapshot() {
        let record = lexvec_types::VectorRecord::from_bytes(&bytes).unwrap();
        assert_eq!(record.dimension(), 768);
    }
}

/// A model whose real output disagrees with its registry entry fails at
/// load time, before any batch is encoded.
#[test]
fn test_model_output_disagreeing_with_registry_fails_load() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 3));

    let loader = MockLoader::new().with_dimension(256);
    let stats = loader.stats();
    let mut orchestrator = BatchOrchestrator::new(
        harness.storage.clone(),
        Encoder::new(loader),
        OrchestratorConfig::default(),
    );
    let result = orchestrator.run(&RunRequest::all(ModelId::Labse), &CancellationToken::new());

    assert!(matches!(
        result,
        Err(IndexingError::Embedding(EmbeddingError::DimensionMismatch {
            expected: 768,
            actual: 256,
            ..
        }))
    ));
    assert!(!orchestrator.encoder().is_loaded());
    assert_eq!(stats.loads(), 1);
    assert_eq!(stats.drops(), 1);
    assert!(harness.vector_snapshot().is_empty());
    assert!(harness.storage.established_dimension().unwrap().is_none());
}

/// The first commit into an empty column establishes the dimension.
#[test]
fn test_first_commit_establishes_dimension() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 5));
    assert!(harness.storage.established_dimension().unwrap().is_none());

    let store = Arc::clone(&harness.storage);
    let report = e2e_tests::run_with(
        store,
        MockLoader::new(),
        &RunRequest::pending(ModelId::MultilingualMinilm).with_batch_size(2),
        &CancellationToken::new(),
    );
    assert_eq!(report.batches_succeeded, 3);

    let established = harness.storage.established_dimension().unwrap().unwrap();
    assert_eq!(established.dimension, 384);
}

/// A model whose output length changes after the first batch stops the run
/// at the first drifted batch; the committed batch stays, nothing later runs.
#[test]
fn test_output_drift_mid_run_aborts() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 12));

    let loader = MockLoader::new().drifting_after(1, 385);
    let stats = loader.stats();
    let report = harness.run(
        loader,
        &RunRequest::pending(ModelId::AllMinilm).with_batch_size(4),
    );

    assert_eq!(
        report.status,
        RunStatus::Failed(RunFailure::DimensionMismatch {
            established: 384,
            incoming: 385,
            model: ModelId::AllMinilm,
        })
    );
    assert_eq!(report.processed, 4);
    assert_eq!(report.batches_succeeded, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(stats.forward_passes(), 2);

    let snapshot = harness.vector_snapshot();
    assert_eq!(snapshot.len(), 4);
    for (_, bytes) in snapshot {
        let record = lexvec_types::VectorRecord::from_bytes(&bytes).unwrap();
        assert_eq!(record.dimension(), 384);
    }
    assert!(matches!(
        report.into_result(),
        Err(IndexingError::DimensionMismatch { .. })
    ));
}

/// When the run starts from a stale view of the store, the commit-time
/// check still rejects the first mismatched batch and the run stops.
#[test]
fn test_commit_time_dimension_conflict_aborts() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 4));
    harness.run(MockLoader::new(), &RunRequest::pending(ModelId::Labse));
    harness.seed(&create_test_chunks("law-2", 8));
    let before = harness.vector_snapshot();

    let store = Arc::new(FlakyStore::new(harness.storage.clone()).hiding_established_dimension());
    let loader = MockLoader::new();
    let stats = loader.stats();
    let report = run_with(
        store.clone(),
        loader,
        &RunRequest::pending(ModelId::AllMinilm).with_batch_size(4),
        &CancellationToken::new(),
    );

    assert_eq!(
        report.status,
        RunStatus::Failed(RunFailure::DimensionMismatch {
            established: 768,
            incoming: 384,
            model: ModelId::AllMinilm,
        })
    );
    assert_eq!(report.processed, 0);
    assert_eq!(store.commits(), 0);
    assert_eq!(stats.forward_passes(), 1);
    assert_eq!(harness.vector_snapshot(), before);

    let established = harness.storage.established_dimension().unwrap().unwrap();
    assert_eq!(established.dimension, 768);
}
