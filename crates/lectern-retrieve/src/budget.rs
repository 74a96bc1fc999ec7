//! Bounded-size context assembly.
//!
//! Packs retrieved passages (most relevant first) into a single string that
//! fits a character budget derived from the model's context window. Each
//! passage is individually capped before formatting so one huge passage
//! cannot exhaust the whole budget. Deterministic and idempotent.

use lectern_core::BudgetConfig;
use lectern_index::IndexedPassage;

use crate::search::SearchResult;

/// Marker appended wherever text was cut.
const ELLIPSIS: char = '…';

/// Character allowance for the blank-line separator between entries.
const SEPARATOR_CHARS: i64 = 2;

/// A retrieved passage queued for context assembly.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub text: String,
    pub page: u32,
    pub heading: String,
}

impl From<&SearchResult> for ContextEntry {
    fn from(result: &SearchResult) -> Self {
        Self {
            text: result.text.clone(),
            page: result.page,
            heading: result.heading.clone(),
        }
    }
}

impl From<&IndexedPassage> for ContextEntry {
    fn from(passage: &IndexedPassage) -> Self {
        Self {
            text: passage.text.clone(),
            page: passage.page,
            heading: passage.heading.clone(),
        }
    }
}

/// Per-entry formatter. Receives the (already capped) entry and its 1-based
/// index; returns the full line.
pub type ContextFormatter = dyn Fn(&ContextEntry, usize) -> String;

/// Default line format: `[1] (Access Control, p.4) text`.
fn default_format(entry: &ContextEntry, index: usize) -> String {
    format!("[{index}] ({}, p.{}) {}", entry.heading, entry.page, entry.text)
}

/// Assemble entries into a context string within the configured budget.
///
/// Entries are added in order. A line that no longer fits is included
/// partially only when enough budget remains to be useful; assembly stops at
/// the first line that does not fit.
pub fn build_budgeted_context(
    entries: &[ContextEntry],
    cfg: &BudgetConfig,
    formatter: Option<&ContextFormatter>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut remaining = cfg.context_chars() as i64;

    for (i, entry) in entries.iter().enumerate() {
        let (capped_text, was_cut) = truncate_chars(&entry.text, cfg.max_single_chunk_chars);
        let capped = ContextEntry {
            text: if was_cut {
                format!("{capped_text}{ELLIPSIS}")
            } else {
                capped_text
            },
            page: entry.page,
            heading: entry.heading.clone(),
        };

        let line = match formatter {
            Some(format) => format(&capped, i + 1),
            None => default_format(&capped, i + 1),
        };

        let line_len = line.chars().count() as i64;
        if line_len > remaining {
            if remaining > cfg.min_partial_chars as i64 {
                let partial: String = line.chars().take((remaining - 3).max(0) as usize).collect();
                parts.push(format!("{partial}{ELLIPSIS}"));
            }
            break;
        }

        parts.push(line);
        remaining -= line_len + SEPARATOR_CHARS;
        if remaining <= 0 {
            break;
        }
    }

    parts.join("\n\n")
}

/// First `max` characters of `s`, with a flag for whether anything was cut.
fn truncate_chars(s: &str, max: usize) -> (String, bool) {
    if s.chars().count() <= max {
        (s.to_string(), false)
    } else {
        (s.chars().take(max).collect(), true)
    }
}
