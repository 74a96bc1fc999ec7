//! Tunable defaults for chunking, retrieval, and context budgeting.
//!
//! The constants here were tuned empirically against one lecture-notes
//! document. They are configuration defaults, not invariants — callers may
//! override any of them.

use serde::{Deserialize, Serialize};

/// Approximate characters per token for BPE-style tokenizers.
pub const CHARS_PER_TOKEN: usize = 4;

/// Rough token-count estimate for a string. Over-counts slightly so callers
/// stay clear of hard context-window limits.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Chunking parameters, expressed in tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens.
    pub chunk_tokens: usize,
    /// Overlap carried from one chunk into the next, in tokens.
    pub overlap_tokens: usize,
    /// Minimum trimmed length (chars) for an end-of-page flush.
    pub min_flush_chars: usize,
}

impl ChunkingConfig {
    /// Target chunk size in characters.
    pub fn chunk_chars(&self) -> usize {
        self.chunk_tokens * CHARS_PER_TOKEN
    }

    /// Overlap window in characters.
    pub fn overlap_chars(&self) -> usize {
        self.overlap_tokens * CHARS_PER_TOKEN
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: 300,
            overlap_tokens: 50,
            min_flush_chars: 50,
        }
    }
}

/// Retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of results returned by default.
    pub top_k: usize,
    /// Maximum number of candidates ranked with cosine similarity before the
    /// lexical pre-filter kicks in.
    pub max_cosine_candidates: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_cosine_candidates: 200,
        }
    }
}

/// Context budget parameters.
///
/// A 4,096-token context window leaves roughly 2,900 tokens for retrieved
/// context after the system message, prompt template, generation room, and a
/// safety margin; rounded down to 2,500 tokens for comfort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Token allowance for the entire context string.
    pub context_tokens: usize,
    /// Cap on any single passage's text so one huge passage cannot consume
    /// the whole budget.
    pub max_single_chunk_chars: usize,
    /// Minimum remaining budget (chars) for a final partial-line inclusion.
    pub min_partial_chars: usize,
}

impl BudgetConfig {
    /// Character budget for the entire context string.
    pub fn context_chars(&self) -> usize {
        self.context_tokens * CHARS_PER_TOKEN
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            context_tokens: 2_500,
            max_single_chunk_chars: 1_200,
            min_partial_chars: 200,
        }
    }
}
