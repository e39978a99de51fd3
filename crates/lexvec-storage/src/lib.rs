//! Storage layer for lexvec.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for chunks, vectors, metadata and checkpoints
//! - A document index for per-document chunk selection
//! - Atomic per-batch vector commits via WriteBatch
//! - An established vector dimension recorded with the first commit
//! - Idempotent chunk writes

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::{BatchCommit, Storage, StoreStatus, VectorWrite};
pub use error::StorageError;
pub use keys::{CheckpointKey, DocChunkKey};
