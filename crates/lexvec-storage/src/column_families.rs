//! Column family definitions for RocksDB.
//!
//! Each column family isolates data with different access patterns:
//! - chunks: Chunk records keyed by chunk id (Zstd compressed text)
//! - doc_chunks: Document to chunk index for per-document selection
//! - vectors: Stored embeddings keyed by chunk id (binary codec)
//! - store_meta: Store-wide metadata such as the established dimension
//! - checkpoints: Last-run summaries

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for chunk records
pub const CF_CHUNKS: &str = "chunks";

/// Column family name for the document -> chunk index
pub const CF_DOC_CHUNKS: &str = "doc_chunks";

/// Column family name for stored vectors
pub const CF_VECTORS: &str = "vectors";

/// Column family name for store metadata
pub const CF_STORE_META: &str = "store_meta";

/// Column family name for run checkpoints
pub const CF_CHECKPOINTS: &str = "checkpoints";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[
    CF_CHUNKS,
    CF_DOC_CHUNKS,
    CF_VECTORS,
    CF_STORE_META,
    CF_CHECKPOINTS,
];

/// Chunk text compresses well and is written once
fn chunks_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_CHUNKS, chunks_options()),
        ColumnFamilyDescriptor::new(CF_DOC_CHUNKS, Options::default()),
        ColumnFamilyDescriptor::new(CF_VECTORS, Options::default()),
        ColumnFamilyDescriptor::new(CF_STORE_META, Options::default()),
        ColumnFamilyDescriptor::new(CF_CHECKPOINTS, Options::default()),
    ]
}
