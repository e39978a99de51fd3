//! Candle-based embedding implementation.
//!
//! Runs any BERT-family model from the registry with attention-masked mean
//! pooling. Padding positions never contribute to the pooled vector, so a
//! text's embedding does not depend on which other texts share its batch.

use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use lexvec_types::ModelDescriptor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::cache::{get_or_download_model, ModelCache, ModelPaths};
use crate::encoder::ModelLoader;
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Candle-based embedder for a registered BERT model.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load a registered model from cache (downloading if needed).
    pub fn load(
        cache: &ModelCache,
        descriptor: &'static ModelDescriptor,
    ) -> Result<Self, EmbeddingError> {
        let paths = get_or_download_model(cache, descriptor)?;
        Self::load_from_paths(descriptor, &paths)
    }

    /// Load from explicit file paths
    pub fn load_from_paths(
        descriptor: &'static ModelDescriptor,
        paths: &ModelPaths,
    ) -> Result<Self, EmbeddingError> {
        info!(model = %descriptor.id, repo = %descriptor.repo_id, "Loading embedding model...");

        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(&paths.config)?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;

        let mut tokenizer = Tokenizer::from_file(&paths.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: descriptor.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let weights: Vec<PathBuf> = vec![paths.weights.clone()];
        // SAFETY: the weights file is owned by the model cache and not
        // modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, DType::F32, &device)? };

        let model = BertModel::load(vb, &config)?;

        info!(
            model = %descriptor.id,
            dim = descriptor.dimension,
            max_seq = descriptor.max_sequence_length,
            "Model loaded successfully"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                id: descriptor.id,
                dimension: descriptor.dimension,
                max_sequence_length: descriptor.max_sequence_length,
            },
        })
    }

    /// Mean pooling over token embeddings (excluding padding)
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, EmbeddingError> {
        let mask = attention_mask
            .unsqueeze(2)?
            .broadcast_as(embeddings.shape())?;
        let mask_f32 = mask.to_dtype(DType::F32)?;

        let masked = embeddings.broadcast_mul(&mask_f32)?;
        let sum = masked.sum(1)?;

        let mask_sum = mask_f32.sum(1)?;
        let mask_sum = mask_sum.clamp(1e-9, f64::MAX)?;

        let mean = sum.broadcast_div(&mask_sum)?;
        Ok(mean)
    }
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::OutputCount {
                expected: 1,
                actual: 0,
            })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(count = texts.len(), model = %self.info.id, "Embedding batch");

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.info.max_sequence_length);

        let batch_size = encodings.len();
        let mut input_ids: Vec<u32> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask: Vec<u32> = Vec::with_capacity(batch_size * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_len);

            input_ids.extend_from_slice(&ids[..len]);
            input_ids.extend(std::iter::repeat(0).take(max_len - len));
            attention_mask.extend_from_slice(&mask[..len]);
            attention_mask.extend(std::iter::repeat(0).take(max_len - len));
        }

        let input_ids = Tensor::from_vec(input_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = Tensor::zeros_like(&input_ids)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = self.mean_pooling(&output, &attention_mask)?;
        let pooled_vec: Vec<Vec<f32>> = pooled.to_vec2()?;

        let embeddings: Vec<Embedding> = pooled_vec.into_iter().map(Embedding::new).collect();

        debug!(
            count = embeddings.len(),
            dim = self.info.dimension,
            "Batch complete"
        );

        Ok(embeddings)
    }
}

/// Loads registered models through Candle, downloading files on first use.
#[derive(Debug, Clone, Default)]
pub struct CandleLoader {
    cache: ModelCache,
}

impl CandleLoader {
    pub fn new(cache: ModelCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }
}

impl ModelLoader for CandleLoader {
    fn load(
        &self,
        descriptor: &'static ModelDescriptor,
    ) -> Result<Box<dyn EmbeddingModel>, EmbeddingError> {
        let embedder = CandleEmbedder::load(&self.cache, descriptor)?;
        Ok(Box::new(embedder))
    }
}
