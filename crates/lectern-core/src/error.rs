//! Error types for Lectern.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The embeddings artifact is missing at its expected location.
    /// Carries a user-actionable remediation message.
    #[error("Embeddings artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Any other artifact fetch or parse failure.
    #[error("Failed to load embeddings artifact: {0}")]
    ArtifactLoad(String),

    /// A model call was made before the engine was initialized.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Both the streaming and non-streaming model paths yielded no text.
    #[error("Model returned an empty response")]
    EmptyGeneration,

    /// The model stream reported an error mid-generation.
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
