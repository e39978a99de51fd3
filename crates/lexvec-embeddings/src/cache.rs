//! Model file caching.
//!
//! Downloads and caches model files from HuggingFace Hub, one directory per
//! registered model.

use std::path::PathBuf;

use lexvec_types::ModelDescriptor;
use tracing::{debug, info};

use crate::error::EmbeddingError;

/// Required model files
pub const MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Model cache configuration
#[derive(Debug, Clone)]
pub struct ModelCache {
    /// Cache directory path
    pub cache_dir: PathBuf,
}

impl Default for ModelCache {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("lexvec")
            .join("models");

        Self { cache_dir }
    }
}

impl ModelCache {
    /// Create a new model cache rooted at `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Get the directory holding a model's files
    pub fn model_dir(&self, descriptor: &ModelDescriptor) -> PathBuf {
        self.cache_dir.join(descriptor.repo_id.replace('/', "_"))
    }

    /// Check if all files for a model are cached
    pub fn is_cached(&self, descriptor: &ModelDescriptor) -> bool {
        let model_dir = self.model_dir(descriptor);
        MODEL_FILES.iter().all(|f| model_dir.join(f).exists())
    }
}

/// Paths to model files
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// Get or download model files for a registered model.
///
/// Returns paths to config.json, tokenizer.json, and model.safetensors.
pub fn get_or_download_model(
    cache: &ModelCache,
    descriptor: &ModelDescriptor,
) -> Result<ModelPaths, EmbeddingError> {
    let model_dir = cache.model_dir(descriptor);

    if cache.is_cached(descriptor) {
        debug!(path = ?model_dir, model = %descriptor.id, "Using cached model");
    } else {
        info!(repo = %descriptor.repo_id, "Downloading model files...");
        download_model_files(cache, descriptor)?;
    }

    Ok(ModelPaths {
        config: model_dir.join("config.json"),
        tokenizer: model_dir.join("tokenizer.json"),
        weights: model_dir.join("model.safetensors"),
    })
}

/// Download model files from HuggingFace Hub
fn download_model_files(
    cache: &ModelCache,
    descriptor: &ModelDescriptor,
) -> Result<(), EmbeddingError> {
    use hf_hub::api::sync::Api;

    let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
    let repo = api.model(descriptor.repo_id.to_string());

    let model_dir = cache.model_dir(descriptor);
    std::fs::create_dir_all(&model_dir)?;

    for filename in MODEL_FILES {
        info!(file = filename, repo = %descriptor.repo_id, "Downloading...");
        let source_path = repo
            .get(filename)
            .map_err(|e| EmbeddingError::Download(format!("{}: {}", filename, e)))?;

        let dest_path = model_dir.join(filename);
        std::fs::copy(&source_path, &dest_path)?;
        debug!(file = filename, "Downloaded to {:?}", dest_path);
    }

    Ok(())
}
