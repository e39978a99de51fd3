//! End-to-end test infrastructure for lexvec.
//!
//! Provides a shared TestHarness, chunk fixtures, a deterministic mock model
//! loader and a store wrapper with injectable commit failures, so whole
//! generation runs can be exercised without downloading model weights.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lexvec_embeddings::{Embedding, EmbeddingError, EmbeddingModel, ModelInfo, ModelLoader};
use lexvec_indexing::{BatchOrchestrator, OrchestratorConfig, RunReport, RunRequest, VectorStore};
use lexvec_storage::{BatchCommit, Storage, StorageError, VectorWrite};
use lexvec_types::{Chunk, GenerationMode, ModelDescriptor, ModelId, StoreDimension};
use tokio_util::sync::CancellationToken;

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Shared storage instance
    pub storage: Arc<Storage>,
}

impl TestHarness {
    /// Create a new test harness with temp directory and storage.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage =
            Arc::new(Storage::open(temp_dir.path()).expect("Failed to open test storage"));
        Self {
            _temp_dir: temp_dir,
            storage,
        }
    }

    /// Store chunks, panicking on failure.
    pub fn seed(&self, chunks: &[Chunk]) {
        self.storage
            .put_chunks(chunks)
            .expect("Failed to seed chunks");
    }

    /// Run one generation pass against the harness storage.
    pub fn run(&self, loader: MockLoader, request: &RunRequest) -> RunReport {
        run_with(self.storage.clone(), loader, request, &CancellationToken::new())
    }

    /// Raw stored bytes for every vector, keyed by chunk ID.
    pub fn vector_snapshot(&self) -> Vec<(String, Vec<u8>)> {
        self.storage
            .iter_vector_bytes()
            .expect("Failed to read vectors")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one generation pass with a fresh encoder over `loader`.
pub fn run_with<S: VectorStore>(
    store: Arc<S>,
    loader: MockLoader,
    request: &RunRequest,
    cancel: &CancellationToken,
) -> RunReport {
    let encoder = lexvec_embeddings::Encoder::with_batch_width(loader, 8);
    let mut orchestrator = BatchOrchestrator::new(store, encoder, OrchestratorConfig::default());
    orchestrator
        .run(request, cancel)
        .expect("Run failed before batching")
}

/// Create `count` chunks alternating Arabic and English legal text.
///
/// Chunk IDs are zero-padded so lexicographic order matches creation order.
pub fn create_test_chunks(document_id: &str, count: usize) -> Vec<Chunk> {
    (0..count)
        .map(|i| {
            let content = if i % 2 == 0 {
                format!("المادة {}: يلتزم المؤجر بتسليم العين المؤجرة", i)
            } else {
                format!("Article {}: the lessor shall deliver the leased property", i)
            };
            Chunk::new(format!("{}-{:04}", document_id, i), document_id, content)
        })
        .collect()
}

/// Call counters shared between a [`MockLoader`] and the models it creates.
#[derive(Debug, Default)]
pub struct LoaderStats {
    pub loads: AtomicUsize,
    pub drops: AtomicUsize,
    pub forward_passes: AtomicUsize,
}

impl LoaderStats {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    pub fn forward_passes(&self) -> usize {
        self.forward_passes.load(Ordering::SeqCst)
    }
}

/// Deterministic loader producing [`MockModel`]s.
///
/// Vectors depend only on the text, never on batch composition, so results
/// are identical whatever batch size a run uses.
#[derive(Clone, Default)]
pub struct MockLoader {
    stats: Arc<LoaderStats>,
    /// Emit vectors of this length instead of the declared dimension
    dimension_override: Option<usize>,
    /// Fail any forward pass containing a text with this substring
    fail_on: Option<String>,
    /// After this many forward passes, emit vectors of the given length
    drift: Option<(usize, usize)>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension_override = Some(dimension);
        self
    }

    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Switch to `dimension`-length output once `after_passes` forward
    /// passes have run. Single-text encodes keep the declared length, so
    /// the load-time check still passes.
    pub fn drifting_after(mut self, after_passes: usize, dimension: usize) -> Self {
        self.drift = Some((after_passes, dimension));
        self
    }

    pub fn stats(&self) -> Arc<LoaderStats> {
        self.stats.clone()
    }
}

impl ModelLoader for MockLoader {
    fn load(
        &self,
        descriptor: &'static ModelDescriptor,
    ) -> Result<Box<dyn EmbeddingModel>, EmbeddingError> {
        self.stats.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockModel {
            info: ModelInfo {
                id: descriptor.id,
                dimension: descriptor.dimension,
                max_sequence_length: descriptor.max_sequence_length,
            },
            output_dimension: self.dimension_override.unwrap_or(descriptor.dimension),
            fail_on: self.fail_on.clone(),
            drift: self.drift,
            stats: self.stats.clone(),
        }))
    }
}

/// Hash-based stand-in for a sentence embedding model.
pub struct MockModel {
    info: ModelInfo,
    output_dimension: usize,
    fail_on: Option<String>,
    drift: Option<(usize, usize)>,
    stats: Arc<LoaderStats>,
}

impl Drop for MockModel {
    fn drop(&mut self) {
        self.stats.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl EmbeddingModel for MockModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        Ok(mock_embedding(text, self.info.id, self.output_dimension))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let pass = self.stats.forward_passes.fetch_add(1, Ordering::SeqCst);
        if let Some((after, dimension)) = self.drift {
            if pass >= after {
                return Ok(texts
                    .iter()
                    .map(|t| mock_embedding(t, self.info.id, dimension))
                    .collect());
            }
        }
        if let Some(needle) = &self.fail_on {
            if texts.iter().any(|t| t.contains(needle.as_str())) {
                return Err(EmbeddingError::Tokenizer(format!(
                    "mock failure on '{}'",
                    needle
                )));
            }
        }
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// The vector [`MockModel`] produces for `text`.
pub fn mock_embedding(text: &str, model: ModelId, dimension: usize) -> Embedding {
    // FNV-1a over model and text
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in model.as_str().bytes().chain(text.bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let values = (0..dimension)
        .map(|i| {
            let mixed = hash.rotate_left((i % 64) as u32) ^ (i as u64).wrapping_mul(0x9e37_79b9);
            (mixed % 1000) as f32 / 1000.0 + 0.001
        })
        .collect();
    Embedding::new(values)
}

/// A [`Storage`] wrapper with scripted commit failures.
///
/// Each call to `write_vector_batch` pops the next scripted outcome; `true`
/// fails the call without touching storage. Once the script is exhausted
/// every call goes through. An optional token is cancelled after a given
/// number of successful commits.
pub struct FlakyStore {
    inner: Arc<Storage>,
    script: Mutex<VecDeque<bool>>,
    commits: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
    hide_established: bool,
}

impl FlakyStore {
    pub fn new(inner: Arc<Storage>) -> Self {
        Self {
            inner,
            script: Mutex::new(VecDeque::new()),
            commits: AtomicUsize::new(0),
            cancel_after: None,
            hide_established: false,
        }
    }

    /// Script commit outcomes, `true` meaning fail.
    pub fn with_script(self, script: impl IntoIterator<Item = bool>) -> Self {
        *self.script.lock().expect("script lock") = script.into_iter().collect();
        self
    }

    /// Cancel `token` once `commits` batches have been committed.
    pub fn cancel_after(mut self, commits: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((commits, token));
        self
    }

    /// Report no established dimension, as a stale read would. Commits
    /// still go through the real store and its own check.
    pub fn hiding_established_dimension(mut self) -> Self {
        self.hide_established = true;
        self
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl VectorStore for FlakyStore {
    fn select(&self, mode: GenerationMode) -> Result<Vec<Chunk>, StorageError> {
        self.inner.select(mode)
    }

    fn established_dimension(&self) -> Result<Option<StoreDimension>, StorageError> {
        if self.hide_established {
            return Ok(None);
        }
        self.inner.established_dimension()
    }

    fn write_vector_batch(
        &self,
        model: ModelId,
        writes: &[VectorWrite],
    ) -> Result<BatchCommit, StorageError> {
        let fail = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(false);
        if fail {
            return Err(StorageError::Serialization("injected write failure".to_string()));
        }

        let commit = self.inner.write_vector_batch(model, writes)?;
        let done = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if done >= *after {
                token.cancel();
            }
        }
        Ok(commit)
    }

    fn vector_ids(&self) -> Result<Vec<String>, StorageError> {
        self.inner.vector_ids()
    }

    fn get_vector_bytes(&self, chunk_id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get_vector_bytes(chunk_id)
    }

    fn iter_vector_bytes(&self) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        self.inner.iter_vector_bytes()
    }

    fn put_checkpoint(&self, job_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.inner.put_checkpoint(job_name, bytes)
    }

    fn get_checkpoint(&self, job_name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get_checkpoint(job_name)
    }
}
