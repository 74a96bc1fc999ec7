//! Embedding backend trait and the no-op fallback.
//!
//! Embeddings are generated once per passage while building the offline
//! artifact; query-time search reuses the vectors persisted there. The
//! `EmbedderBackend` trait abstracts over the model:
//! - `OnnxEmbedder`: ONNX Runtime with all-MiniLM-L6-v2 (requires the `onnx`
//!   feature)
//! - `NoopEmbedder`: returns None to signal no model is available

use ndarray::Array1;

/// Result of an embedding operation: a mean-pooled, L2-normalized vector
/// (384-dim for all-MiniLM-L6-v2).
pub struct EmbeddingResult {
    pub embedding: Array1<f32>,
}

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Generate an embedding for a text string.
    /// Returns None if the embedder is not available.
    fn embed(&self, text: &str) -> Option<EmbeddingResult>;

    /// Generate embeddings for a batch of texts.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Option<EmbeddingResult>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Check if the embedder is available (model loaded).
    fn is_available(&self) -> bool;
}

/// Placeholder embedder that always returns None.
pub struct NoopEmbedder {
    dim: usize,
}

impl NoopEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbedderBackend for NoopEmbedder {
    fn embed(&self, _text: &str) -> Option<EmbeddingResult> {
        None
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// L2-normalize a vector in place. Leaves the zero vector untouched.
pub fn l2_normalize(v: &mut Array1<f32>) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.mapv_inplace(|x| x / norm);
    }
}
