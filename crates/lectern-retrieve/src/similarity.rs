//! Cosine similarity and query tokenization.

/// Cosine similarity using precomputed norms, so only the dot product is
/// paid per candidate. Returns 0 when either norm is 0.
pub fn fast_cosine(query: &[f32], query_norm: f32, doc: &[f32], doc_norm: f32) -> f32 {
    if query_norm == 0.0 || doc_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(doc).map(|(a, b)| a * b).sum();
    dot / (query_norm * doc_norm)
}

/// Tokenize a query for lexical matching: lower-case, replace
/// non-alphanumerics with spaces, split on whitespace, drop tokens of two
/// characters or fewer.
pub fn tokenize(input: &str) -> Vec<String> {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|token| token.len() > 2)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_index::vector_norm;

    #[test]
    fn test_cosine_of_vector_with_itself_is_one() {
        let v = [0.3, -1.2, 4.0];
        let n = vector_norm(&v);
        assert!((fast_cosine(&v, n, &v, n) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_is_scale_invariant() {
        let v = [1.0, 2.0, 3.0];
        let scaled: Vec<f32> = v.iter().map(|x| x * 7.5).collect();
        let similarity = fast_cosine(&v, vector_norm(&v), &scaled, vector_norm(&scaled));
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_with_zero_norm_is_zero() {
        let v = [1.0, 2.0];
        let zero = [0.0, 0.0];
        assert_eq!(fast_cosine(&v, vector_norm(&v), &zero, 0.0), 0.0);
        assert_eq!(fast_cosine(&zero, 0.0, &v, vector_norm(&v)), 0.0);
    }

    #[test]
    fn test_tokenize_strips_punctuation_and_short_tokens() {
        assert_eq!(tokenize("Access-Control, now!"), ["access", "control", "now"]);
        assert_eq!(tokenize("a an of"), Vec::<String>::new());
        assert_eq!(tokenize("  "), Vec::<String>::new());
    }
}
