//! Front-matter and table-of-contents noise detection.
//!
//! Extracted lecture PDFs start with a title/author page and often a table of
//! contents whose dot leaders survive text extraction. Passages from those
//! pages add noise to retrieval and are dropped at index-build time.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fraction of a passage that may be dot-leader runs before it is treated as
/// TOC noise.
const TOC_DOT_FRACTION: f64 = 0.35;

/// Pages at or below this number are eligible for the near-empty check.
const EARLY_PAGE_MAX: u32 = 3;

/// Minimum residual characters (after stripping dots and whitespace) for an
/// early page to count as real content.
const MIN_RESIDUAL_CHARS: usize = 60;

static DOT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

/// Total length of all runs of two or more consecutive dots.
pub fn dot_leader_len(text: &str) -> usize {
    DOT_RUN.find_iter(text).map(|m| m.as_str().len()).sum()
}

/// Whether a passage is title-page or table-of-contents noise.
///
/// Page 1 is always the title/author page. Later pages are noise when dot
/// leaders dominate the text, or when an early page has almost no content
/// left after stripping dots and whitespace.
pub fn is_intro_or_toc(text: &str, page: u32) -> bool {
    if page == 1 {
        return true;
    }

    let len = text.chars().count();
    if len > 0 && dot_leader_len(text) as f64 > len as f64 * TOC_DOT_FRACTION {
        return true;
    }

    if page <= EARLY_PAGE_MAX {
        let residual = text
            .chars()
            .filter(|c| *c != '.' && !c.is_whitespace())
            .count();
        if residual < MIN_RESIDUAL_CHARS {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_leader_len() {
        assert_eq!(dot_leader_len("no leaders here."), 0);
        assert_eq!(dot_leader_len("Intro..... 4"), 5);
        assert_eq!(dot_leader_len("a.. b..."), 5);
    }

    #[test]
    fn test_page_one_is_always_noise() {
        assert!(is_intro_or_toc(
            "A perfectly substantial paragraph of real content that would \
             otherwise pass every other check in this module.",
            1
        ));
    }

    #[test]
    fn test_toc_page_detected_by_dot_leaders() {
        let toc = "Introduction............... 2 Access Control............... 5";
        assert!(is_intro_or_toc(toc, 2));
    }

    #[test]
    fn test_near_empty_early_page() {
        // Too little residual content on page 3, but fine on page 4 where the
        // early-page check no longer applies.
        assert!(is_intro_or_toc("Course notes", 3));
        assert!(!is_intro_or_toc("Course notes", 4));
    }

    #[test]
    fn test_real_content_passes() {
        let text = "Least privilege grants only the minimum access necessary for a \
                    task, which limits the damage a compromised component can do.";
        assert!(!is_intro_or_toc(text, 4));
        assert!(!is_intro_or_toc(text, 2));
    }
}
