//! Quality and consistency checks over stored vectors.
//!
//! Read-only. For every vector in scope the checker verifies that its
//! dimension matches the established one, that it is not degenerate (all
//! zero, or holding NaN/infinity), and that its stored bytes survive a
//! decode -> encode -> decode round trip.

use std::sync::Arc;

use lexvec_types::VectorRecord;
use rand::seq::IteratorRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::IndexingError;
use crate::store::VectorStore;

/// Maximum per-coordinate drift accepted by the round-trip check
pub const ROUND_TRIP_TOLERANCE: f32 = 1e-6;

/// Which stored vectors to audit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditScope {
    All,
    /// A uniform random sample of at most this many vectors
    Sample(usize),
}

impl AuditScope {
    /// Map a configured sample size to a scope, 0 meaning every vector
    pub fn from_sample_size(sample_size: usize) -> Self {
        if sample_size == 0 {
            AuditScope::All
        } else {
            AuditScope::Sample(sample_size)
        }
    }
}

/// A problem found in one stored vector
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditIssue {
    DimensionMismatch { expected: usize, actual: usize },
    ZeroVector,
    NonFinite { count: usize },
    RoundTrip(String),
}

/// All issues found for one chunk's vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditFinding {
    pub chunk_id: String,
    pub issues: Vec<AuditIssue>,
}

/// Result of an audit pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    /// Vectors in the store
    pub total_vectors: usize,
    /// Vectors inspected
    pub checked: usize,
    pub established_dimension: Option<usize>,
    pub dimension_mismatches: usize,
    pub zero_vectors: usize,
    pub non_finite: usize,
    pub round_trip_failures: usize,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    fn record(&mut self, chunk_id: String, issues: Vec<AuditIssue>) {
        self.checked += 1;
        if issues.is_empty() {
            return;
        }
        for issue in &issues {
            match issue {
                AuditIssue::DimensionMismatch { .. } => self.dimension_mismatches += 1,
                AuditIssue::ZeroVector => self.zero_vectors += 1,
                AuditIssue::NonFinite { .. } => self.non_finite += 1,
                AuditIssue::RoundTrip(_) => self.round_trip_failures += 1,
            }
        }
        self.findings.push(AuditFinding { chunk_id, issues });
    }
}

/// Runs audits against a store.
pub struct QualityChecker<S> {
    store: Arc<S>,
}

impl<S: VectorStore> QualityChecker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn audit(&self, scope: AuditScope) -> Result<AuditReport, IndexingError> {
        let established = self.store.established_dimension()?.map(|d| d.dimension);
        let mut report = AuditReport {
            established_dimension: established,
            ..AuditReport::default()
        };

        match scope {
            AuditScope::All => {
                let entries = self.store.iter_vector_bytes()?;
                report.total_vectors = entries.len();
                for (chunk_id, bytes) in entries {
                    let issues = inspect(&bytes, established);
                    report.record(chunk_id, issues);
                }
            }
            AuditScope::Sample(size) => {
                let ids = self.store.vector_ids()?;
                report.total_vectors = ids.len();
                let mut sample = ids.into_iter().choose_multiple(&mut rand::rng(), size);
                sample.sort();
                debug!(sampled = sample.len(), "Auditing vector sample");

                for chunk_id in sample {
                    // Removed by a concurrent clear
                    let Some(bytes) = self.store.get_vector_bytes(&chunk_id)? else {
                        continue;
                    };
                    let issues = inspect(&bytes, established);
                    report.record(chunk_id, issues);
                }
            }
        }

        if report.is_clean() {
            info!(checked = report.checked, "Vector audit clean");
        } else {
            warn!(
                checked = report.checked,
                flagged = report.findings.len(),
                dimension_mismatches = report.dimension_mismatches,
                zero_vectors = report.zero_vectors,
                non_finite = report.non_finite,
                round_trip_failures = report.round_trip_failures,
                "Vector audit found problems"
            );
        }
        Ok(report)
    }
}

/// Inspect one stored vector's bytes.
pub fn inspect(bytes: &[u8], established: Option<usize>) -> Vec<AuditIssue> {
    let record = match VectorRecord::from_bytes(bytes) {
        Ok(record) => record,
        Err(e) => return vec![AuditIssue::RoundTrip(format!("undecodable record: {}", e))],
    };

    let mut issues = Vec::new();

    if let Some(expected) = established {
        if record.dimension() != expected {
            issues.push(AuditIssue::DimensionMismatch {
                expected,
                actual: record.dimension(),
            });
        }
    }

    let non_finite = record.values.iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
        issues.push(AuditIssue::NonFinite { count: non_finite });
    } else if record.values.iter().all(|v| *v == 0.0) {
        issues.push(AuditIssue::ZeroVector);
    }

    if let Err(reason) = check_round_trip(&record) {
        issues.push(AuditIssue::RoundTrip(reason));
    }

    issues
}

fn check_round_trip(record: &VectorRecord) -> Result<(), String> {
    let reread = VectorRecord::from_bytes(&record.to_bytes()).map_err(|e| e.to_string())?;

    if reread.model != record.model {
        return Err(format!("model changed from {} to {}", record.model, reread.model));
    }
    if reread.values.len() != record.values.len() {
        return Err(format!(
            "length changed from {} to {}",
            record.values.len(),
            reread.values.len()
        ));
    }
    for (i, (before, after)) in record.values.iter().zip(&reread.values).enumerate() {
        let same = if before.is_nan() || after.is_nan() {
            before.is_nan() && after.is_nan()
        } else if before.is_infinite() || after.is_infinite() {
            before == after
        } else {
            (before - after).abs() <= ROUND_TRIP_TOLERANCE
        };
        if !same {
            return Err(format!("value {} changed from {} to {}", i, before, after));
        }
    }
    Ok(())
}
