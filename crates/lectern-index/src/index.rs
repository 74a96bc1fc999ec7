//! Normalized in-memory passage index.
//!
//! Each retained record carries two derived fields computed exactly once when
//! it enters the index: the Euclidean norm of its embedding (so cosine
//! similarity only needs a dot product at query time) and a lower-cased
//! heading+text haystack for fast substring matching.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lectern_core::Error;
use lectern_ingest::{clean_heading, infer_heading_from_text, is_intro_or_toc, is_valid_topic_filtered};

use crate::artifact::RawPassage;

/// Index-build options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Non-topic names (e.g. the author byline from the title page) that
    /// disqualify a heading during normalization.
    pub banned_headings: Vec<String>,
}

/// A passage with precomputed search acceleration fields.
///
/// `norm` and `haystack` are always consistent with the passage they were
/// derived from; they are computed on entry and never mutated independently.
#[derive(Debug, Clone)]
pub struct IndexedPassage {
    pub text: String,
    pub page: u32,
    pub heading: String,
    pub embedding: Vec<f32>,
    /// Euclidean norm of `embedding`.
    pub norm: f32,
    /// Lower-cased `heading + " " + text`.
    pub haystack: String,
}

/// Euclidean (L2) norm of a vector.
pub fn vector_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// The loaded, immutable passage index.
///
/// A failed load yields a valid-but-empty index with a recorded user-facing
/// error message, so downstream consumers degrade gracefully.
#[derive(Debug, Default)]
pub struct PassageIndex {
    passages: Vec<IndexedPassage>,
    topics: Vec<String>,
    load_error: Option<Error>,
}

impl PassageIndex {
    /// An empty index with no recorded error.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty index recording why the load failed.
    pub fn failed(error: Error) -> Self {
        Self {
            load_error: Some(error),
            ..Self::default()
        }
    }

    /// Build an index from raw artifact records: drop noise and invalid
    /// records, normalize headings, precompute norms and haystacks.
    pub fn from_records(records: Vec<RawPassage>, cfg: &IndexConfig) -> Self {
        let mut passages: Vec<IndexedPassage> = Vec::with_capacity(records.len());
        let mut dim: Option<usize> = None;

        for record in records {
            if record.text.trim().is_empty() {
                continue;
            }
            if is_intro_or_toc(&record.text, record.page) {
                continue;
            }
            // All embeddings in one index must share a dimensionality.
            let expected = *dim.get_or_insert(record.embedding.len());
            if record.embedding.len() != expected {
                warn!(
                    page = record.page,
                    got = record.embedding.len(),
                    expected,
                    "dropping passage with mismatched embedding dimension"
                );
                continue;
            }

            let cleaned = clean_heading(&record.heading);
            let heading = if is_valid_topic_filtered(&cleaned, &cfg.banned_headings) {
                cleaned
            } else {
                infer_heading_from_text(&record.text)
            };

            let haystack = format!("{} {}", heading, record.text).to_lowercase();
            let norm = vector_norm(&record.embedding);

            passages.push(IndexedPassage {
                text: record.text,
                page: record.page,
                heading,
                embedding: record.embedding,
                norm,
                haystack,
            });
        }

        let topics = distinct_topics(&passages, cfg);
        debug!(
            passages = passages.len(),
            topics = topics.len(),
            "built passage index"
        );

        Self {
            passages,
            topics,
            load_error: None,
        }
    }

    pub fn passages(&self) -> &[IndexedPassage] {
        &self.passages
    }

    /// Distinct validated topics, in order of first appearance.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// The recorded user-facing error, when the load failed.
    pub fn load_error(&self) -> Option<&Error> {
        self.load_error.as_ref()
    }
}

fn distinct_topics(passages: &[IndexedPassage], cfg: &IndexConfig) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for passage in passages {
        if passage.heading.is_empty()
            || !is_valid_topic_filtered(&passage.heading, &cfg.banned_headings)
        {
            continue;
        }
        if !topics.contains(&passage.heading) {
            topics.push(passage.heading.clone());
        }
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, page: u32, heading: &str, embedding: Vec<f32>) -> RawPassage {
        RawPassage {
            text: text.to_string(),
            page,
            heading: heading.to_string(),
            embedding,
        }
    }

    fn substantial(topic: &str) -> String {
        format!(
            "{topic} is covered in depth here, with enough real sentence content \
             to clear every front-matter noise threshold in the pipeline."
        )
    }

    #[test]
    fn test_vector_norm() {
        assert_eq!(vector_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(vector_norm(&[]), 0.0);
    }

    #[test]
    fn test_norm_and_haystack_are_precomputed() {
        let idx = PassageIndex::from_records(
            vec![record(&substantial("Least privilege"), 4, "Access Control", vec![3.0, 4.0])],
            &IndexConfig::default(),
        );
        assert_eq!(idx.len(), 1);
        let p = &idx.passages()[0];
        assert_eq!(p.norm, 5.0);
        assert!(p.haystack.starts_with("access control least privilege"));
    }

    #[test]
    fn test_page_one_noise_is_dropped() {
        let idx = PassageIndex::from_records(
            vec![
                record(&substantial("Title page"), 1, "General", vec![1.0]),
                record(&substantial("Access control"), 4, "Access Control", vec![1.0]),
            ],
            &IndexConfig::default(),
        );
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.passages()[0].page, 4);
    }

    #[test]
    fn test_invalid_heading_is_inferred_from_text() {
        let idx = PassageIndex::from_records(
            vec![record(
                "Memory Safety Basics. The heap and the stack differ in lifetime \
                 management, and both matter for writing correct programs.",
                5,
                "5 / 12",
                vec![1.0],
            )],
            &IndexConfig::default(),
        );
        assert_eq!(idx.passages()[0].heading, "Memory Safety Basics");
    }

    #[test]
    fn test_mismatched_embedding_dimension_is_dropped() {
        let idx = PassageIndex::from_records(
            vec![
                record(&substantial("First topic"), 4, "Topic One", vec![1.0, 0.0]),
                record(&substantial("Second topic"), 5, "Topic Two", vec![1.0]),
            ],
            &IndexConfig::default(),
        );
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_topics_are_distinct_and_validated() {
        let idx = PassageIndex::from_records(
            vec![
                record(&substantial("Access control"), 4, "Access Control", vec![1.0]),
                record(&substantial("More access control"), 5, "Access Control", vec![1.0]),
                record(&substantial("Memory safety"), 6, "Memory Safety", vec![1.0]),
            ],
            &IndexConfig::default(),
        );
        assert_eq!(idx.topics(), ["Access Control", "Memory Safety"]);
    }

    #[test]
    fn test_failed_index_is_empty_with_error() {
        let idx = PassageIndex::failed(Error::ArtifactLoad("something broke".to_string()));
        assert!(idx.is_empty());
        assert!(idx
            .load_error()
            .unwrap()
            .to_string()
            .contains("something broke"));
    }
}
