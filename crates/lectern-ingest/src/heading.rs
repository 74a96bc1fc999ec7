//! Heading detection, cleaning, validation, and inference.
//!
//! Extracted lecture notes carry noisy headings: page fractions ("5 / 12"),
//! emoji prefixes, TOC dot leaders, and sentence fragments. The predicates
//! here decide what counts as a real section heading and repair unusable ones.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::noise::dot_leader_len;

/// Sentinel heading used before the first real heading is seen.
pub const GENERAL_HEADING: &str = "General";

/// Generic label when no topic can be inferred from passage text.
pub const FALLBACK_HEADING: &str = "Course Notes";

/// Maximum length (chars) for a heading candidate line.
const MAX_HEADING_CHARS: usize = 60;

static PAGE_FRACTION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\d+\s*/\s*\d+\s*$").unwrap());

static LEADING_EMOJI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Emoji}\p{Emoji_Presentation}\s]+").unwrap());

static NUMBER_OR_FRACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\s*(/\s*\d+)?\s*$").unwrap());

/// Strip a trailing " N / M" page-fraction suffix and any leading
/// emoji/whitespace run, then trim.
pub fn clean_heading(heading: &str) -> String {
    let no_fraction = PAGE_FRACTION_SUFFIX.replace(heading, "");
    LEADING_EMOJI.replace(&no_fraction, "").trim().to_string()
}

/// Whether a heading names a real topic: not a page number or fraction, at
/// least four alphabetic characters, and not the "General" sentinel.
pub fn is_valid_topic(heading: &str) -> bool {
    is_valid_topic_filtered(heading, &[])
}

/// [`is_valid_topic`] that additionally rejects headings containing any of
/// the given non-topic names (e.g. the author byline from a title page).
pub fn is_valid_topic_filtered(heading: &str, banned_names: &[String]) -> bool {
    if NUMBER_OR_FRACTION.is_match(heading) {
        return false;
    }
    let alpha = heading.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if alpha < 4 {
        return false;
    }
    let lower = heading.to_lowercase();
    if lower == "general" {
        return false;
    }
    !banned_names
        .iter()
        .any(|name| !name.is_empty() && lower.contains(&name.to_lowercase()))
}

/// Named heading-quality rules. Each is a pure predicate over a trimmed line
/// so it can be tested on its own.
pub mod rules {
    use super::*;

    /// Contains at least four alphabetic characters.
    pub fn has_min_alpha(line: &str) -> bool {
        line.chars().filter(|c| c.is_ascii_alphabetic()).count() >= 4
    }

    /// A bare integer such as "11".
    pub fn is_bare_number(line: &str) -> bool {
        static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\s*$").unwrap());
        RE.is_match(line)
    }

    /// A page fraction such as "5 / 12".
    pub fn is_page_fraction(line: &str) -> bool {
        static RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^\s*\d+\s*/\s*\d+\s*$").unwrap());
        RE.is_match(line)
    }

    /// Dominated (>30% of length) by runs of two or more dots — TOC leaders.
    pub fn is_dot_leader_run(line: &str) -> bool {
        let len = line.chars().count();
        len > 0 && dot_leader_len(line) as f64 > len as f64 * 0.3
    }

    /// Starts with a lowercase connective word and names no definitional
    /// keyword — a sentence fragment, not a heading.
    pub fn starts_like_sentence(line: &str) -> bool {
        static LEAD: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?i)^(for |the |a |an |if |but |so |or |and |it |this |that |is |are |was |were )",
            )
            .unwrap()
        });
        static DEFINITIONAL: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)definition|principle|theorem|concept|rule|law|property").unwrap()
        });
        let stripped = LEADING_EMOJI.replace(line, "");
        LEAD.is_match(&stripped) && !DEFINITIONAL.is_match(&stripped)
    }
}

/// Whether a line looks like a real section heading rather than a page
/// number, fraction, TOC leader, or sentence fragment.
pub fn is_likely_heading(line: &str) -> bool {
    rules::has_min_alpha(line)
        && !rules::is_bare_number(line)
        && !rules::is_page_fraction(line)
        && !rules::is_dot_leader_run(line)
        && !rules::starts_like_sentence(line)
}

/// Whether a trimmed fragment qualifies as a heading candidate: short, not
/// ending in sentence punctuation, and passing the quality rules.
pub fn is_heading_candidate(trimmed: &str) -> bool {
    let len = trimmed.chars().count();
    if len == 0 || len >= MAX_HEADING_CHARS {
        return false;
    }
    if trimmed.ends_with(['.', '!', '?', ',', ';', ':']) {
        return false;
    }
    is_likely_heading(trimmed)
}

/// Derive a topic from passage text when the declared heading is unusable.
///
/// Tries section markers like "Part 1: Mechanisms" or "1.3 Containment
/// Mechanisms", then a leading capitalized phrase, then falls back to a
/// generic label. Always returns a non-empty displayable topic.
pub fn infer_heading_from_text(text: &str) -> String {
    static PART_MARKER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"Part\s+\d+[:.]\s*([A-Z][A-Za-z\s]+)").unwrap());
    static SECTION_MARKER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\d+\.\d+\.?\s+([A-Z][A-Za-z\s]{4,40})").unwrap());
    static LEAD_PHRASE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:.*?\s{2,})?([A-Z][A-Za-z\s]{4,50}?)(?:\s{2,}|[.!?])").unwrap()
    });

    if let Some(caps) = PART_MARKER
        .captures(text)
        .or_else(|| SECTION_MARKER.captures(text))
    {
        if let Some(title) = caps.get(1) {
            let title = title.as_str().trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    if let Some(caps) = LEAD_PHRASE.captures(text) {
        if let Some(phrase) = caps.get(1) {
            let phrase = phrase.as_str().trim();
            if !phrase.is_empty() {
                return phrase.to_string();
            }
        }
    }

    FALLBACK_HEADING.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_heading_strips_page_fraction() {
        assert_eq!(clean_heading("Access Control  2 / 12"), "Access Control");
        assert_eq!(clean_heading("Access Control"), "Access Control");
    }

    #[test]
    fn test_clean_heading_strips_leading_emoji() {
        assert_eq!(clean_heading("🔒 Access Control"), "Access Control");
    }

    #[test]
    fn test_is_valid_topic() {
        assert!(!is_valid_topic("11"));
        assert!(!is_valid_topic("1 / 12"));
        assert!(is_valid_topic("Access Control"));
        assert!(!is_valid_topic("General"));
        assert!(!is_valid_topic("general"));
        assert!(!is_valid_topic("a b"));
    }

    #[test]
    fn test_is_valid_topic_filtered_rejects_banned_names() {
        let banned = vec!["Jordan Smith".to_string()];
        assert!(!is_valid_topic_filtered("Notes by Jordan Smith", &banned));
        assert!(is_valid_topic_filtered("Access Control", &banned));
    }

    #[test]
    fn test_rules_individually() {
        assert!(rules::has_min_alpha("Memory Safety"));
        assert!(!rules::has_min_alpha("1.2"));
        assert!(rules::is_bare_number(" 42 "));
        assert!(rules::is_page_fraction("5 / 12"));
        assert!(rules::is_dot_leader_run("Intro......... 4"));
        assert!(rules::starts_like_sentence("the stack grows downward"));
        assert!(!rules::starts_like_sentence("The Principle of Least Privilege"));
    }

    #[test]
    fn test_is_heading_candidate() {
        assert!(is_heading_candidate("Access Control Mechanisms"));
        assert!(!is_heading_candidate("This continues the sentence."));
        assert!(!is_heading_candidate("5 / 12"));
        assert!(!is_heading_candidate(""));
    }

    #[test]
    fn test_infer_heading_section_markers() {
        assert_eq!(infer_heading_from_text("Part 1: Mechanisms"), "Mechanisms");
        assert_eq!(
            infer_heading_from_text("1.3 Containment Mechanisms are used to..."),
            "Containment Mechanisms are used to"
        );
    }

    #[test]
    fn test_infer_heading_lead_phrase_and_fallback() {
        assert_eq!(
            infer_heading_from_text("Memory Safety Basics. The heap and the stack..."),
            "Memory Safety Basics"
        );
        assert_eq!(infer_heading_from_text("42 17 99"), FALLBACK_HEADING);
    }
}
