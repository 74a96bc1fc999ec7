//! Offline artifact construction: extracted pages → chunks → embeddings.
//!
//! This is the build-time half of the system. It runs once per source
//! document and produces the `embeddings.json` artifact the runtime index
//! loads.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::info;

use lectern_core::{ChunkingConfig, Error, Result};
use lectern_index::{Artifact, RawPassage};
use lectern_ingest::{Chunker, PageText};

use crate::embedder::EmbedderBackend;

/// Chunk pages and embed every passage into an artifact.
///
/// Fails with [`Error::ModelUnavailable`] when the backend has no model, or
/// when any individual passage cannot be embedded — a partially embedded
/// artifact would violate the fixed-dimensionality invariant.
pub fn build_artifact(
    pages: &[PageText],
    cfg: &ChunkingConfig,
    embedder: &dyn EmbedderBackend,
) -> Result<Artifact> {
    if !embedder.is_available() {
        return Err(Error::ModelUnavailable(
            "embedding backend is not available".to_string(),
        ));
    }

    let chunker = Chunker::new(cfg.clone());
    let passages = chunker.chunk_pages(pages);
    info!(pages = pages.len(), passages = passages.len(), "chunked pages");

    let mut chunks = Vec::with_capacity(passages.len());
    for passage in passages {
        let Some(result) = embedder.embed(&passage.text) else {
            return Err(Error::ModelUnavailable(format!(
                "embedding failed for a passage on page {}",
                passage.page
            )));
        };
        chunks.push(RawPassage {
            text: passage.text,
            page: passage.page,
            heading: passage.heading,
            embedding: result.embedding.to_vec(),
        });
    }

    info!(chunks = chunks.len(), "built embeddings artifact");
    Ok(Artifact { chunks })
}

/// Read extracted pages from a JSON file: `[{ "page": 1, "text": "..." }]`.
pub fn read_pages(path: &Path) -> Result<Vec<PageText>> {
    let file = File::open(path)?;
    let pages = serde_json::from_reader(BufReader::new(file))?;
    Ok(pages)
}

/// Write an artifact as JSON.
pub fn write_artifact(path: &Path, artifact: &Artifact) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), artifact)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::{EmbeddingResult, NoopEmbedder};
    use ndarray::Array1;

    /// Deterministic stand-in: embeds text as [len, vowel count], normalized.
    struct FakeEmbedder;

    impl EmbedderBackend for FakeEmbedder {
        fn embed(&self, text: &str) -> Option<EmbeddingResult> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
            let mut embedding = Array1::from_vec(vec![text.len() as f32, vowels]);
            crate::embedder::l2_normalize(&mut embedding);
            Some(EmbeddingResult { embedding })
        }

        fn dimension(&self) -> usize {
            2
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn pages() -> Vec<PageText> {
        vec![PageText {
            page: 1,
            text: "Least privilege grants only the minimum access necessary. \
                   Every component should run with the fewest rights that still \
                   let it do its job."
                .to_string(),
        }]
    }

    #[test]
    fn test_build_artifact_embeds_every_passage() {
        let artifact =
            build_artifact(&pages(), &ChunkingConfig::default(), &FakeEmbedder).unwrap();
        assert!(!artifact.chunks.is_empty());
        for chunk in &artifact.chunks {
            assert_eq!(chunk.embedding.len(), 2);
            assert!(!chunk.text.trim().is_empty());
        }
    }

    #[test]
    fn test_build_artifact_requires_available_backend() {
        let err = build_artifact(&pages(), &ChunkingConfig::default(), &NoopEmbedder::new(2))
            .unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[test]
    fn test_write_then_parse_round_trip() {
        let artifact =
            build_artifact(&pages(), &ChunkingConfig::default(), &FakeEmbedder).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        write_artifact(&path, &artifact).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let records = lectern_index::parse_artifact(&body).unwrap();
        assert_eq!(records.len(), artifact.chunks.len());
    }
}
