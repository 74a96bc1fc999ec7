//! Chat message and token-stream types.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

/// Chat message in conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A single streamed token, the end-of-stream marker, or an error.
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(String),
}

/// Boxed stream type for returning different stream implementations.
pub type BoxedTokenStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;
