//! Page-wise document chunking with heading tracking and overlap.
//!
//! Raw per-page text is split into sentence-like fragments; a running buffer
//! flushes into passages at the target chunk size and at heading boundaries,
//! reseeding itself with a trailing overlap window so context carries across
//! chunk edges. All sizes are measured in characters, not bytes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use lectern_core::ChunkingConfig;

use crate::heading::{self, GENERAL_HEADING};

/// Raw extracted text for one source page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based source page number.
    pub page: u32,
    pub text: String,
}

/// A chunked passage before embedding: text plus its page and topic heading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtoPassage {
    pub text: String,
    pub page: u32,
    pub heading: String,
}

/// Splits extracted pages into overlapping, heading-tagged passages.
pub struct Chunker {
    cfg: ChunkingConfig,
}

impl Chunker {
    pub fn new(cfg: ChunkingConfig) -> Self {
        Self { cfg }
    }

    /// Chunk an ordered sequence of pages into proto-passages.
    ///
    /// Passages appear in page order, then buffer-flush order within a page.
    /// A page with no qualifying heading inherits the most recent heading
    /// from a prior page.
    pub fn chunk_pages(&self, pages: &[PageText]) -> Vec<ProtoPassage> {
        let chunk_chars = self.cfg.chunk_chars();
        let overlap_chars = self.cfg.overlap_chars();
        // A heading boundary only flushes once the buffer holds enough text
        // to make a coherent passage.
        let heading_flush_min = chunk_chars * 3 / 10;

        let mut passages = Vec::new();
        let mut current_heading = GENERAL_HEADING.to_string();

        for page in pages {
            let mut buffer = String::new();

            for fragment in split_fragments(&page.text) {
                if heading::is_heading_candidate(fragment) {
                    let buffered = buffer.chars().count();
                    if buffered > heading_flush_min {
                        // Flush under the heading the buffered text was
                        // written under, not the one we are about to adopt.
                        push_passage(&mut passages, &buffer, page.page, &current_heading);
                        buffer = tail_chars(&buffer, overlap_chars);
                    }
                    let cleaned = heading::clean_heading(fragment);
                    current_heading = if cleaned.is_empty() {
                        fragment.to_string()
                    } else {
                        cleaned
                    };
                }

                buffer.push(' ');
                buffer.push_str(fragment);

                if buffer.chars().count() >= chunk_chars {
                    push_passage(&mut passages, &buffer, page.page, &current_heading);
                    buffer = tail_chars(&buffer, overlap_chars);
                }
            }

            if buffer.trim().chars().count() > self.cfg.min_flush_chars {
                push_passage(&mut passages, &buffer, page.page, &current_heading);
            }
        }

        debug!(
            pages = pages.len(),
            passages = passages.len(),
            "chunked document"
        );
        passages
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

fn push_passage(passages: &mut Vec<ProtoPassage>, buffer: &str, page: u32, heading: &str) {
    let text = buffer.trim();
    if text.is_empty() {
        return;
    }
    passages.push(ProtoPassage {
        text: text.to_string(),
        page,
        heading: heading.to_string(),
    });
}

/// Split page text into sentence-like fragments at whitespace following
/// `.`, `!`, or `?`. Fragments are trimmed; empty ones are dropped.
fn split_fragments(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'.' || b == b'!' || b == b'?')
            && i + 1 < bytes.len()
            && bytes[i + 1].is_ascii_whitespace()
        {
            let fragment = text[start..=i].trim();
            if !fragment.is_empty() {
                fragments.push(fragment);
            }
            start = i + 1;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        fragments.push(tail);
    }
    fragments
}

/// Last `n` characters of `s` (all of `s` when shorter).
fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    if count <= n {
        return s.to_string();
    }
    s.chars().skip(count - n).collect()
}
