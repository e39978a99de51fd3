//! # lexvec-types
//!
//! Shared domain types for the lexvec embedding core.
//!
//! This crate defines the data structures used throughout the system:
//! - Chunks: the atomic units of legal text that receive an embedding
//! - Model registry: the closed set of embedding models and their dimensions
//! - Vector records: stored embeddings and their binary codec
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use lexvec_types::{resolve, ModelId};
//!
//! let descriptor = resolve("labse").unwrap();
//! assert_eq!(descriptor.id, ModelId::Labse);
//! assert_eq!(descriptor.dimension, 768);
//! ```

pub mod chunk;
pub mod config;
pub mod error;
pub mod model;
pub mod vector;

pub use chunk::{Chunk, GenerationMode};
pub use config::{AuditSettings, GenerationConfig, Settings};
pub use error::LexvecError;
pub use model::{resolve, ModelDescriptor, ModelId, Specialization};
pub use vector::{StoreDimension, VectorRecord, VECTOR_CODEC_VERSION};
