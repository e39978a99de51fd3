//! Encoder: owns at most one loaded model and turns texts into vectors.
//!
//! One encoder is constructed per run and handed to the orchestrator. The
//! model is loaded once and reused for every batch; it is dropped on
//! `unload`, on replacement, or when the encoder itself is dropped.

use lexvec_types::ModelDescriptor;
use tracing::{debug, info, warn};

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel};

/// Default number of texts per forward pass.
pub const DEFAULT_ENCODE_BATCH_WIDTH: usize = 32;

/// Maximum per-coordinate difference allowed between a text encoded alone
/// and the same text encoded inside a larger batch.
pub const BATCH_INVARIANCE_TOLERANCE: f32 = 1e-5;

/// Text used to verify a freshly loaded model's output dimension.
const PROBE_TEXT: &str = "probe";

/// Creates model instances for registry descriptors.
pub trait ModelLoader: Send + Sync {
    fn load(
        &self,
        descriptor: &'static ModelDescriptor,
    ) -> Result<Box<dyn EmbeddingModel>, EmbeddingError>;
}

struct LoadedModel {
    descriptor: &'static ModelDescriptor,
    model: Box<dyn EmbeddingModel>,
}

/// Scoped owner of the loaded embedding model.
pub struct Encoder<L> {
    loader: L,
    batch_width: usize,
    loaded: Option<LoadedModel>,
}

impl<L: ModelLoader> Encoder<L> {
    pub fn new(loader: L) -> Self {
        Self::with_batch_width(loader, DEFAULT_ENCODE_BATCH_WIDTH)
    }

    /// Create an encoder with a custom forward-pass width (minimum 1).
    pub fn with_batch_width(loader: L, batch_width: usize) -> Self {
        Self {
            loader,
            batch_width: batch_width.max(1),
            loaded: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Descriptor of the currently loaded model, if any.
    pub fn descriptor(&self) -> Option<&'static ModelDescriptor> {
        self.loaded.as_ref().map(|l| l.descriptor)
    }

    pub fn batch_width(&self) -> usize {
        self.batch_width
    }

    /// Load `descriptor`, reusing the current model when it is the same one.
    ///
    /// A different model replaces the current one; the old instance is
    /// released before the new one is created. If loading or the dimension
    /// probe fails, the encoder is left unloaded.
    pub fn load(&mut self, descriptor: &'static ModelDescriptor) -> Result<(), EmbeddingError> {
        if let Some(current) = &self.loaded {
            if current.descriptor.id == descriptor.id {
                debug!(model = %descriptor.id, "Model already loaded, reusing");
                return Ok(());
            }
        }

        if let Some(previous) = self.loaded.take() {
            info!(
                previous = %previous.descriptor.id,
                next = %descriptor.id,
                "Replacing loaded model"
            );
            drop(previous);
        }

        let model = self.loader.load(descriptor)?;
        let probe = model.embed(PROBE_TEXT)?;
        if probe.dimension() != descriptor.dimension {
            warn!(
                model = %descriptor.id,
                declared = descriptor.dimension,
                actual = probe.dimension(),
                "Model output disagrees with registry dimension"
            );
            return Err(EmbeddingError::DimensionMismatch {
                model: descriptor.id,
                expected: descriptor.dimension,
                actual: probe.dimension(),
            });
        }

        info!(model = %descriptor.id, dim = descriptor.dimension, "Model ready");
        self.loaded = Some(LoadedModel { descriptor, model });
        Ok(())
    }

    /// Release the loaded model, if any.
    pub fn unload(&mut self) {
        if let Some(previous) = self.loaded.take() {
            debug!(model = %previous.descriptor.id, "Model unloaded");
        }
    }

    /// Encode a single text.
    pub fn encode(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let loaded = self.loaded.as_ref().ok_or(EmbeddingError::NotLoaded)?;
        validate_text(text).map_err(|reason| EmbeddingError::InvalidInput { index: 0, reason })?;
        let embedding = loaded.model.embed(text)?;
        check_dimension(loaded.descriptor, &embedding)?;
        Ok(embedding)
    }

    /// Encode texts in order, one vector per input.
    ///
    /// Inputs are validated up front so a bad text fails the call before any
    /// forward pass runs.
    pub fn encode_many<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Embedding>, EmbeddingError> {
        let loaded = self.loaded.as_ref().ok_or(EmbeddingError::NotLoaded)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        for (index, text) in texts.iter().enumerate() {
            validate_text(text.as_ref())
                .map_err(|reason| EmbeddingError::InvalidInput { index, reason })?;
        }

        let mut out = Vec::with_capacity(texts.len());
        for window in texts.chunks(self.batch_width) {
            let refs: Vec<&str> = window.iter().map(AsRef::as_ref).collect();
            let embeddings = loaded.model.embed_batch(&refs)?;
            if embeddings.len() != refs.len() {
                return Err(EmbeddingError::OutputCount {
                    expected: refs.len(),
                    actual: embeddings.len(),
                });
            }
            for embedding in &embeddings {
                check_dimension(loaded.descriptor, embedding)?;
            }
            out.extend(embeddings);
        }

        debug!(count = out.len(), model = %loaded.descriptor.id, "Encoded texts");
        Ok(out)
    }
}

/// Reject texts the encoder must not see: empty, whitespace-only, or
/// containing NUL.
pub fn validate_text(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("text is empty".to_string());
    }
    if text.contains('\0') {
        return Err("text contains a NUL character".to_string());
    }
    Ok(())
}

fn check_dimension(
    descriptor: &ModelDescriptor,
    embedding: &Embedding,
) -> Result<(), EmbeddingError> {
    if embedding.dimension() != descriptor.dimension {
        return Err(EmbeddingError::DimensionMismatch {
            model: descriptor.id,
            expected: descriptor.dimension,
            actual: embedding.dimension(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelInfo;
    use lexvec_types::ModelId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        loads: AtomicUsize,
        drops: AtomicUsize,
        batches: AtomicUsize,
    }

    struct MockModel {
        info: ModelInfo,
        output_dim: usize,
        counters: Arc<Counters>,
    }

    impl Drop for MockModel {
        fn drop(&mut self) {
            self.counters.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl EmbeddingModel for MockModel {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            let seed = text.chars().map(|c| c as u32 as f32).sum::<f32>();
            Ok(Embedding::new(
                (0..self.output_dim).map(|i| seed + i as f32).collect(),
            ))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
            self.counters.batches.fetch_add(1, Ordering::SeqCst);
            texts.iter().map(|t| self.embed(t)).collect()
        }
    }

    struct MockLoader {
        counters: Arc<Counters>,
        fail: bool,
        wrong_dim: bool,
    }

    impl MockLoader {
        fn new() -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            (
                Self {
                    counters: counters.clone(),
                    fail: false,
                    wrong_dim: false,
                },
                counters,
            )
        }
    }

    impl ModelLoader for MockLoader {
        fn load(
            &self,
            descriptor: &'static ModelDescriptor,
        ) -> Result<Box<dyn EmbeddingModel>, EmbeddingError> {
            if self.fail {
                return Err(EmbeddingError::ModelNotFound(descriptor.repo_id.to_string()));
            }
            self.counters.loads.fetch_add(1, Ordering::SeqCst);
            let output_dim = if self.wrong_dim {
                descriptor.dimension + 1
            } else {
                descriptor.dimension
            };
            Ok(Box::new(MockModel {
                info: ModelInfo {
                    id: descriptor.id,
                    dimension: descriptor.dimension,
                    max_sequence_length: descriptor.max_sequence_length,
                },
                output_dim,
                counters: self.counters.clone(),
            }))
        }
    }

    #[test]
    fn test_encode_requires_loaded_model() {
        let (loader, _) = MockLoader::new();
        let encoder = Encoder::new(loader);
        assert!(matches!(encoder.encode("text"), Err(EmbeddingError::NotLoaded)));
        assert!(matches!(
            encoder.encode_many(&["text"]),
            Err(EmbeddingError::NotLoaded)
        ));
    }

    #[test]
    fn test_load_is_idempotent() {
        let (loader, counters) = MockLoader::new();
        let mut encoder = Encoder::new(loader);
        encoder.load(ModelId::Labse.descriptor()).unwrap();
        encoder.load(ModelId::Labse.descriptor()).unwrap();
        assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
        assert_eq!(encoder.descriptor().map(|d| d.id), Some(ModelId::Labse));
    }

    #[test]
    fn test_load_different_model_releases_previous() {
        let (loader, counters) = MockLoader::new();
        let mut encoder = Encoder::new(loader);
        encoder.load(ModelId::Labse.descriptor()).unwrap();
        encoder.load(ModelId::AllMinilm.descriptor()).unwrap();
        assert_eq!(counters.loads.load(Ordering::SeqCst), 2);
        assert_eq!(counters.drops.load(Ordering::SeqCst), 1);
        assert_eq!(encoder.encode("x").unwrap().dimension(), 384);
    }

    #[test]
    fn test_failed_load_leaves_encoder_unloaded() {
        let (mut loader, counters) = MockLoader::new();
        loader.fail = false;
        let mut encoder = Encoder::new(loader);
        encoder.load(ModelId::Labse.descriptor()).unwrap();

        encoder.loader.fail = true;
        assert!(encoder.load(ModelId::Arabert.descriptor()).is_err());
        assert!(!encoder.is_loaded());
        assert_eq!(counters.drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_probe_detects_registry_drift() {
        let (mut loader, counters) = MockLoader::new();
        loader.wrong_dim = true;
        let mut encoder = Encoder::new(loader);
        let err = encoder.load(ModelId::AllMinilm.descriptor()).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 384,
                actual: 385,
                ..
            }
        ));
        assert!(!encoder.is_loaded());
        assert_eq!(counters.drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unload_releases_model() {
        let (loader, counters) = MockLoader::new();
        let mut encoder = Encoder::new(loader);
        encoder.load(ModelId::AllMinilm.descriptor()).unwrap();
        encoder.unload();
        assert!(!encoder.is_loaded());
        assert_eq!(counters.drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_encode_many_empty_and_order() {
        let (loader, _) = MockLoader::new();
        let mut encoder = Encoder::new(loader);
        encoder.load(ModelId::AllMinilm.descriptor()).unwrap();

        let empty: [&str; 0] = [];
        assert!(encoder.encode_many(&empty).unwrap().is_empty());

        let texts = ["alpha", "beta", "gamma"];
        let many = encoder.encode_many(&texts).unwrap();
        assert_eq!(many.len(), 3);
        for (text, embedding) in texts.iter().zip(&many) {
            assert_eq!(&encoder.encode(text).unwrap(), embedding);
        }
    }

    #[test]
    fn test_encode_many_splits_into_windows() {
        let (loader, counters) = MockLoader::new();
        let mut encoder = Encoder::with_batch_width(loader, 4);
        encoder.load(ModelId::AllMinilm.descriptor()).unwrap();

        let texts: Vec<String> = (0..10).map(|i| format!("text {i}")).collect();
        let wide = encoder.encode_many(&texts).unwrap();
        assert_eq!(wide.len(), 10);
        assert_eq!(counters.batches.load(Ordering::SeqCst), 3);

        for (text, embedding) in texts.iter().zip(&wide) {
            let alone = encoder.encode(text).unwrap();
            for (a, b) in alone.values.iter().zip(&embedding.values) {
                assert!((a - b).abs() <= BATCH_INVARIANCE_TOLERANCE);
            }
        }
    }

    #[test]
    fn test_invalid_text_rejected_with_position() {
        let (loader, _) = MockLoader::new();
        let mut encoder = Encoder::new(loader);
        encoder.load(ModelId::AllMinilm.descriptor()).unwrap();

        let err = encoder.encode_many(&["ok", "   ", "fine"]).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput { index: 1, .. }));

        let err = encoder.encode_many(&["ok", "bad\0text"]).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput { index: 1, .. }));
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("المادة").is_ok());
        assert!(validate_text("").is_err());
        assert!(validate_text("\n\t").is_err());
        assert!(validate_text("a\0b").is_err());
    }

    #[test]
    fn test_zero_batch_width_clamped() {
        let (loader, _) = MockLoader::new();
        let encoder = Encoder::with_batch_width(loader, 0);
        assert_eq!(encoder.batch_width(), 1);
    }
}
