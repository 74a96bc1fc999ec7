//! Lectern Embed — embedding backend and offline artifact builder.
//!
//! Provides the `EmbedderBackend` trait for generating passage embeddings.
//! When the `onnx` feature is enabled and model files are present,
//! `OnnxEmbedder` loads all-MiniLM-L6-v2 for 384-dim embeddings. Without it,
//! `NoopEmbedder` is used and artifact builds fail fast.

pub mod builder;
pub mod embedder;
pub mod onnx;

pub use builder::{build_artifact, read_pages, write_artifact};
pub use embedder::{EmbedderBackend, EmbeddingResult, NoopEmbedder};

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

/// Create the best available embedder for the given model directory.
///
/// Tries ONNX first (if the feature is enabled and model files are present),
/// falls back to `NoopEmbedder`.
pub fn create_embedder(model_dir: &Path) -> Arc<dyn EmbedderBackend> {
    #[cfg(feature = "onnx")]
    {
        match OnnxEmbedder::load(model_dir) {
            Ok(embedder) => {
                tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
                return Arc::new(embedder);
            }
            Err(e) => {
                tracing::warn!("ONNX embedder unavailable: {}", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::info!("ONNX feature disabled; no embedding model available.");
    }

    Arc::new(NoopEmbedder::new(384))
}
