//! Persisted embeddings artifact schema and validation.
//!
//! The artifact is a JSON document of shape `{ "chunks": [...] }` produced by
//! the offline builder. Records are validated individually on load so one
//! malformed entry cannot poison the whole index.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One passage record as persisted in the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPassage {
    pub text: String,
    /// 1-based source page number.
    pub page: u32,
    pub heading: String,
    pub embedding: Vec<f32>,
}

/// The persisted embeddings artifact.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub chunks: Vec<RawPassage>,
}

#[derive(Deserialize)]
struct ArtifactDoc {
    #[serde(default)]
    chunks: Vec<serde_json::Value>,
}

/// Parse artifact JSON, discarding records that fail shape validation.
///
/// Returns an error only when the document itself is not valid JSON of the
/// expected outer shape.
pub fn parse_artifact(body: &str) -> serde_json::Result<Vec<RawPassage>> {
    let doc: ArtifactDoc = serde_json::from_str(body)?;
    let total = doc.chunks.len();
    let records: Vec<RawPassage> = doc
        .chunks
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    if records.len() < total {
        warn!(
            dropped = total - records.len(),
            total, "dropped malformed artifact records"
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_artifact() {
        let body = r#"{"chunks":[{"text":"t","page":4,"heading":"H","embedding":[0.1,0.2]}]}"#;
        let records = parse_artifact(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].page, 4);
        assert_eq!(records[0].embedding, vec![0.1, 0.2]);
    }

    #[test]
    fn test_malformed_records_are_dropped_individually() {
        let body = r#"{"chunks":[
            {"text":"good","page":2,"heading":"H","embedding":[1.0]},
            {"text":42,"page":"nope","heading":"H","embedding":[1.0]},
            {"text":"missing embedding","page":3,"heading":"H"}
        ]}"#;
        let records = parse_artifact(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "good");
    }

    #[test]
    fn test_missing_chunks_key_yields_empty() {
        assert!(parse_artifact("{}").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(parse_artifact("not json").is_err());
    }
}
