//! JSON rescue for model output.
//!
//! Models asked for strict JSON still wrap it in prose or code fences. The
//! extraction ladder tries progressively looser slices of the response until
//! one parses: direct → fence-stripped → first `[...]` → first `{...}`.
//! Malformed entries inside an otherwise valid array are skipped rather than
//! rejecting the whole response.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Wrapper keys models like to put around the array they were asked for.
const WRAPPER_KEYS: &[&str] = &["cards", "questions", "items"];

/// Extract a typed array from free-form model output. Returns an empty vec
/// when nothing parses.
pub fn extract_json_array<T: DeserializeOwned>(text: &str) -> Vec<T> {
    let trimmed = text.trim();

    let direct = try_parse(trimmed);
    if !direct.is_empty() {
        return direct;
    }

    let unfenced = strip_code_fence(trimmed);
    let fenced = try_parse(unfenced);
    if !fenced.is_empty() {
        return fenced;
    }

    if let Some(slice) = bracket_slice(unfenced, '[', ']') {
        let parsed = try_parse(slice);
        if !parsed.is_empty() {
            return parsed;
        }
    }

    if let Some(slice) = bracket_slice(unfenced, '{', '}') {
        let parsed = try_parse(slice);
        if !parsed.is_empty() {
            return parsed;
        }
    }

    Vec::new()
}

fn try_parse<T: DeserializeOwned>(input: &str) -> Vec<T> {
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Array(items)) => from_values(items),
        Ok(Value::Object(mut map)) => WRAPPER_KEYS
            .iter()
            .find_map(|key| map.remove(*key))
            .and_then(|value| match value {
                Value::Array(items) => Some(from_values(items)),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn from_values<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let mut s = text;
    if let Some(rest) = s.strip_prefix("```") {
        s = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest)
            .trim_start();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim_end();
    }
    s
}

fn bracket_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
