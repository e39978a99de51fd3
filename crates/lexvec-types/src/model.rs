//! Embedding model registry.
//!
//! The registry is a static table: every identifier maps to exactly one
//! repository and one declared output dimensionality. Identifiers are exact,
//! case-sensitive strings. Near misses are rejected rather than guessed,
//! because loading the wrong model silently changes the vector dimension.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LexvecError;

/// Closed set of supported embedding models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelId {
    /// paraphrase-multilingual-MiniLM-L12-v2 (384 dims)
    #[default]
    MultilingualMinilm,
    /// LaBSE (768 dims)
    Labse,
    /// AraBERT v0.2 base (768 dims)
    Arabert,
    /// all-MiniLM-L6-v2 (384 dims)
    AllMinilm,
}

/// Language specialization of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Multilingual,
    Arabic,
    English,
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Specialization::Multilingual => write!(f, "multilingual"),
            Specialization::Arabic => write!(f, "arabic"),
            Specialization::English => write!(f, "english"),
        }
    }
}

/// Immutable description of a registered model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Registry identifier
    pub id: ModelId,
    /// HuggingFace repository holding config, tokenizer and weights
    pub repo_id: &'static str,
    /// Declared output dimensionality
    pub dimension: usize,
    /// Maximum sequence length in tokens
    pub max_sequence_length: usize,
    /// Language specialization
    pub specialization: Specialization,
}

static MULTILINGUAL_MINILM: ModelDescriptor = ModelDescriptor {
    id: ModelId::MultilingualMinilm,
    repo_id: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2",
    dimension: 384,
    max_sequence_length: 128,
    specialization: Specialization::Multilingual,
};

static LABSE: ModelDescriptor = ModelDescriptor {
    id: ModelId::Labse,
    repo_id: "sentence-transformers/LaBSE",
    dimension: 768,
    max_sequence_length: 256,
    specialization: Specialization::Multilingual,
};

static ARABERT: ModelDescriptor = ModelDescriptor {
    id: ModelId::Arabert,
    repo_id: "aubmindlab/bert-base-arabertv02",
    dimension: 768,
    max_sequence_length: 256,
    specialization: Specialization::Arabic,
};

static ALL_MINILM: ModelDescriptor = ModelDescriptor {
    id: ModelId::AllMinilm,
    repo_id: "sentence-transformers/all-MiniLM-L6-v2",
    dimension: 384,
    max_sequence_length: 256,
    specialization: Specialization::English,
};

impl ModelId {
    /// Every registered model, in display order.
    pub const ALL: [ModelId; 4] = [
        ModelId::MultilingualMinilm,
        ModelId::Labse,
        ModelId::Arabert,
        ModelId::AllMinilm,
    ];

    /// The registry identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::MultilingualMinilm => "multilingual-minilm",
            ModelId::Labse => "labse",
            ModelId::Arabert => "arabert",
            ModelId::AllMinilm => "all-minilm",
        }
    }

    /// The static descriptor for this model
    pub fn descriptor(self) -> &'static ModelDescriptor {
        match self {
            ModelId::MultilingualMinilm => &MULTILINGUAL_MINILM,
            ModelId::Labse => &LABSE,
            ModelId::Arabert => &ARABERT,
            ModelId::AllMinilm => &ALL_MINILM,
        }
    }

    fn known_identifiers() -> String {
        Self::ALL
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = LexvecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| LexvecError::UnknownModel {
                requested: s.to_string(),
                known: Self::known_identifiers(),
            })
    }
}

/// Resolve a model identifier to its descriptor.
///
/// Fails with [`LexvecError::UnknownModel`] before any loading cost is paid.
pub fn resolve(identifier: &str) -> Result<&'static ModelDescriptor, LexvecError> {
    identifier.parse::<ModelId>().map(ModelId::descriptor)
}
