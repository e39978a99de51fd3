//! Dimension guard.
//!
//! Every vector in a store shares one dimensionality. The first committed
//! batch establishes it; any later vector of a different length is a fatal
//! violation, never something to truncate or pad.

use lexvec_embeddings::Embedding;
use thiserror::Error;

/// Result of an accepted dimension check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// No dimension was established; the incoming one will become it
    Establishes,
    /// Incoming dimension equals the established one
    Matches,
}

/// Incoming vectors disagree with the established dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("established dimension is {established}, incoming vector has {incoming}")]
pub struct DimensionViolation {
    pub established: usize,
    pub incoming: usize,
}

/// Check one incoming dimension against the established one.
pub fn check(established: Option<usize>, incoming: usize) -> Result<GuardOutcome, DimensionViolation> {
    match established {
        None => Ok(GuardOutcome::Establishes),
        Some(dim) if dim == incoming => Ok(GuardOutcome::Matches),
        Some(dim) => Err(DimensionViolation {
            established: dim,
            incoming,
        }),
    }
}

/// Tracks the established dimension across the batches of one run.
#[derive(Debug, Clone, Default)]
pub struct DimensionGuard {
    established: Option<usize>,
}

impl DimensionGuard {
    pub fn new(established: Option<usize>) -> Self {
        Self { established }
    }

    pub fn established(&self) -> Option<usize> {
        self.established
    }

    /// Check every vector of a batch. Within a batch that would establish
    /// the dimension, all vectors must still agree with the first.
    pub fn check_batch(&self, embeddings: &[Embedding]) -> Result<GuardOutcome, DimensionViolation> {
        let mut expected = self.established;
        let mut outcome = GuardOutcome::Matches;
        for embedding in embeddings {
            if check(expected, embedding.dimension())? == GuardOutcome::Establishes {
                expected = Some(embedding.dimension());
                outcome = GuardOutcome::Establishes;
            }
        }
        Ok(outcome)
    }

    /// Record a dimension after the batch carrying it was committed.
    pub fn commit(&mut self, dimension: usize) {
        if self.established.is_none() {
            self.established = Some(dimension);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn emb(dim: usize) -> Embedding {
        Embedding::from_normalized(vec![0.0; dim])
    }

    #[test]
    fn test_check() {
        assert_eq!(check(None, 384), Ok(GuardOutcome::Establishes));
        assert_eq!(check(Some(768), 768), Ok(GuardOutcome::Matches));
        assert_eq!(
            check(Some(768), 384),
            Err(DimensionViolation {
                established: 768,
                incoming: 384
            })
        );
    }

    #[test]
    fn test_batch_on_empty_store_must_agree_internally() {
        let guard = DimensionGuard::default();
        assert_eq!(
            guard.check_batch(&[emb(4), emb(4)]),
            Ok(GuardOutcome::Establishes)
        );
        assert_eq!(
            guard.check_batch(&[emb(4), emb(5)]),
            Err(DimensionViolation {
                established: 4,
                incoming: 5
            })
        );
    }

    #[test]
    fn test_commit_establishes_once() {
        let mut guard = DimensionGuard::new(None);
        guard.commit(384);
        guard.commit(768);
        assert_eq!(guard.established(), Some(384));
        assert_eq!(guard.check_batch(&[emb(384)]), Ok(GuardOutcome::Matches));
        assert!(guard.check_batch(&[emb(768)]).is_err());
    }
}
