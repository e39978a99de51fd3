//! # lexvec-embeddings
//!
//! Text normalization and local embedding generation for lexvec using Candle.
//!
//! ## Features
//! - Arabic-aware text normalization applied before every encode
//! - Local inference via Candle for every registered BERT model
//! - Per-model file caching under the user cache directory
//! - An [`Encoder`] that owns one loaded model at a time and batches texts
//!   without letting batch composition change the output
//!
//! Works offline after the initial model download.

pub mod cache;
pub mod candle;
pub mod encoder;
pub mod error;
pub mod model;
pub mod normalize;

pub use crate::candle::{CandleEmbedder, CandleLoader};
pub use cache::{get_or_download_model, ModelCache, ModelPaths, MODEL_FILES};
pub use encoder::{
    validate_text, Encoder, ModelLoader, BATCH_INVARIANCE_TOLERANCE, DEFAULT_ENCODE_BATCH_WIDTH,
};
pub use error::EmbeddingError;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
pub use normalize::normalize;
