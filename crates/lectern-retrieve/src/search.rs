//! Vector and lexical nearest-neighbor retrieval.
//!
//! Both modes are pure functions over the immutable index slice: no side
//! effects, safe to call concurrently. Results come back sorted by descending
//! score with a stable tie-break (index order preserved for equal scores).

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use lectern_core::RetrievalConfig;
use lectern_index::{vector_norm, IndexedPassage};

use crate::similarity::{fast_cosine, tokenize};

/// A ranked retrieval hit. Cosine scores fall in [-1, 1]; lexical scores in
/// [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub page: u32,
    pub heading: String,
    pub score: f32,
}

impl SearchResult {
    fn from_passage(passage: &IndexedPassage, score: f32) -> Self {
        Self {
            text: passage.text.clone(),
            page: passage.page,
            heading: passage.heading.clone(),
            score,
        }
    }
}

/// Vector search with the default retrieval configuration.
pub fn search(
    passages: &[IndexedPassage],
    query_embedding: &[f32],
    top_k: usize,
    query_text: Option<&str>,
) -> Vec<SearchResult> {
    search_with(
        passages,
        query_embedding,
        top_k,
        query_text,
        &RetrievalConfig::default(),
    )
}

/// Vector search: rank candidates by cosine similarity against the query
/// embedding and return the top `top_k`.
///
/// When the index exceeds the candidate ceiling and query text is supplied,
/// a cheap lexical pre-filter narrows the pool first so we avoid O(N) dot
/// products; a pre-filter that matches nothing falls back to the full index.
pub fn search_with(
    passages: &[IndexedPassage],
    query_embedding: &[f32],
    top_k: usize,
    query_text: Option<&str>,
    cfg: &RetrievalConfig,
) -> Vec<SearchResult> {
    if query_embedding.is_empty() || passages.is_empty() {
        return Vec::new();
    }

    let query_norm = vector_norm(query_embedding);

    let mut candidates: Vec<&IndexedPassage> = passages.iter().collect();
    if passages.len() > cfg.max_cosine_candidates {
        if let Some(query_text) = query_text {
            let tokens = tokenize(query_text);
            if !tokens.is_empty() {
                let mut with_hits: Vec<(&IndexedPassage, usize)> = passages
                    .iter()
                    .map(|p| {
                        let hits = tokens
                            .iter()
                            .filter(|t| p.haystack.contains(t.as_str()))
                            .count();
                        (p, hits)
                    })
                    .filter(|(_, hits)| *hits > 0)
                    .collect();
                with_hits.sort_by(|a, b| b.1.cmp(&a.1));
                if !with_hits.is_empty() {
                    candidates = with_hits
                        .into_iter()
                        .take(cfg.max_cosine_candidates)
                        .map(|(p, _)| p)
                        .collect();
                    debug!(
                        candidates = candidates.len(),
                        total = passages.len(),
                        "lexical pre-filter narrowed candidate pool"
                    );
                }
            }
        }
    }

    let mut scored: Vec<SearchResult> = candidates
        .into_iter()
        .map(|p| {
            let score = fast_cosine(query_embedding, query_norm, &p.embedding, p.norm);
            SearchResult::from_passage(p, score)
        })
        .collect();

    sort_by_score_desc(&mut scored);
    scored.truncate(top_k);
    scored
}

/// Lexical search by token overlap: score each passage by the fraction of
/// distinct query tokens found as substrings of its haystack. Zero-score
/// passages are filtered out, not returned.
pub fn search_by_text(
    passages: &[IndexedPassage],
    query: &str,
    top_k: usize,
) -> Vec<SearchResult> {
    if query.trim().is_empty() || passages.is_empty() {
        return Vec::new();
    }

    let mut unique: Vec<String> = Vec::new();
    for token in tokenize(query) {
        if !unique.contains(&token) {
            unique.push(token);
        }
    }
    if unique.is_empty() {
        return Vec::new();
    }
    let total = unique.len() as f32;

    let mut scored: Vec<SearchResult> = passages
        .iter()
        .filter_map(|p| {
            let matches = unique
                .iter()
                .filter(|t| p.haystack.contains(t.as_str()))
                .count();
            if matches == 0 {
                return None;
            }
            Some(SearchResult::from_passage(p, matches as f32 / total))
        })
        .collect();

    sort_by_score_desc(&mut scored);
    scored.truncate(top_k);
    scored
}

/// Stable descending sort, so equal scores keep their index order.
fn sort_by_score_desc(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
