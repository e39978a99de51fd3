//! Quality audit E2E tests.

use pretty_assertions::assert_eq;

use e2e_tests::{create_test_chunks, MockLoader, TestHarness};
use lexvec_indexing::{AuditIssue, AuditScope, QualityChecker, RunRequest};
use lexvec_storage::VectorWrite;
use lexvec_types::ModelId;

/// Vectors produced by a run pass every check.
#[test]
fn test_audit_clean_after_run() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 15));
    harness.run(MockLoader::new(), &RunRequest::pending(ModelId::MultilingualMinilm));

    let report = QualityChecker::new(harness.storage.clone())
        .audit(AuditScope::All)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.total_vectors, 15);
    assert_eq!(report.checked, 15);
    assert_eq!(report.established_dimension, Some(384));
}

/// Degenerate vectors written behind the orchestrator's back are flagged,
/// and the audit itself changes nothing.
#[test]
fn test_audit_flags_degenerate_vectors() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 6));
    harness.run(MockLoader::new(), &RunRequest::pending(ModelId::AllMinilm));

    let mut nan = vec![0.5f32; 384];
    nan[10] = f32::NAN;
    harness
        .storage
        .write_vector_batch(
            ModelId::AllMinilm,
            &[
                VectorWrite::new("law-1-0001", vec![0.0; 384]),
                VectorWrite::new("law-1-0004", nan),
            ],
        )
        .unwrap();
    let before = harness.vector_snapshot();

    let report = QualityChecker::new(harness.storage.clone())
        .audit(AuditScope::All)
        .unwrap();

    assert_eq!(report.checked, 6);
    assert_eq!(report.zero_vectors, 1);
    assert_eq!(report.non_finite, 1);
    assert_eq!(report.dimension_mismatches, 0);
    assert_eq!(report.round_trip_failures, 0);

    let flagged: Vec<_> = report
        .findings
        .iter()
        .map(|f| (f.chunk_id.as_str(), f.issues.clone()))
        .collect();
    assert_eq!(
        flagged,
        vec![
            ("law-1-0001", vec![AuditIssue::ZeroVector]),
            ("law-1-0004", vec![AuditIssue::NonFinite { count: 1 }]),
        ]
    );

    assert_eq!(harness.vector_snapshot(), before);
}

/// Sampling bounds how many vectors are inspected.
#[test]
fn test_audit_sample() {
    let harness = TestHarness::new();
    harness.seed(&create_test_chunks("law-1", 20));
    harness.run(MockLoader::new(), &RunRequest::pending(ModelId::AllMinilm));
    let checker = QualityChecker::new(harness.storage.clone());

    let sampled = checker.audit(AuditScope::Sample(5)).unwrap();
    assert_eq!(sampled.total_vectors, 20);
    assert_eq!(sampled.checked, 5);

    let oversized = checker.audit(AuditScope::Sample(100)).unwrap();
    assert_eq!(oversized.checked, 20);
}

/// An empty store audits clean.
#[test]
fn test_audit_empty_store() {
    let harness = TestHarness::new();
    let report = QualityChecker::new(harness.storage.clone())
        .audit(AuditScope::All)
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.checked, 0);
    assert_eq!(report.established_dimension, None);
}
