//! Chat engine abstraction.
//!
//! The language model is an external collaborator: given an ordered list of
//! messages it produces a lazy, finite sequence of text tokens. The core
//! consumes the stream strictly in order and may stop polling at any time;
//! abandoning a stream has no side effects on the engine.

use async_trait::async_trait;
use tokio_stream::StreamExt;
use tracing::debug;

use lectern_core::{Error, Result};

use crate::types::{BoxedTokenStream, ChatMessage, StreamChunk};

/// Trait for chat completion engines.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// Stream tokens for a chat completion.
    fn stream_chat(&self, messages: Vec<ChatMessage>) -> BoxedTokenStream;

    /// Non-streaming completion, used as a fallback when the streaming path
    /// yields nothing.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Whether the engine has a model loaded and ready.
    fn is_ready(&self) -> bool;
}

/// Placeholder engine used before a model is initialized. Every call fails
/// with [`Error::ModelUnavailable`].
pub struct NullEngine;

#[async_trait]
impl ChatEngine for NullEngine {
    fn stream_chat(&self, _messages: Vec<ChatMessage>) -> BoxedTokenStream {
        Box::pin(tokio_stream::once(StreamChunk::Error(
            "model not initialized".to_string(),
        )))
    }

    async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String> {
        Err(Error::ModelUnavailable("model not initialized".to_string()))
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// Collect a full completion: stream tokens, and when the stream produces no
/// text fall back to one non-streaming call. An empty fallback is surfaced as
/// [`Error::EmptyGeneration`].
pub async fn generate_text(engine: &dyn ChatEngine, messages: Vec<ChatMessage>) -> Result<String> {
    let mut stream = engine.stream_chat(messages.clone());
    let mut output = String::new();
    let mut emitted = false;

    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(token) => {
                if !token.is_empty() {
                    emitted = true;
                    output.push_str(&token);
                }
            }
            StreamChunk::Done { tokens_used } => {
                debug!(tokens_used, "stream complete");
                break;
            }
            StreamChunk::Error(message) => return Err(Error::Generation(message)),
        }
    }

    if emitted {
        return Ok(output);
    }

    debug!("stream yielded no tokens, falling back to non-streaming call");
    let fallback = engine.complete(messages).await?;
    if fallback.is_empty() {
        return Err(Error::EmptyGeneration);
    }
    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Engine scripted with a fixed stream and fallback response.
    struct ScriptedEngine {
        tokens: Vec<&'static str>,
        fallback: &'static str,
    }

    #[async_trait]
    impl ChatEngine for ScriptedEngine {
        fn stream_chat(&self, _messages: Vec<ChatMessage>) -> BoxedTokenStream {
            let chunks: Vec<StreamChunk> = self
                .tokens
                .iter()
                .map(|t| StreamChunk::Token(t.to_string()))
                .chain(std::iter::once(StreamChunk::Done { tokens_used: 0 }))
                .collect();
            Box::pin(tokio_stream::iter(chunks))
        }

        async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            Ok(self.fallback.to_string())
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_generate_collects_streamed_tokens() {
        let engine = ScriptedEngine {
            tokens: vec!["Least ", "privilege."],
            fallback: "unused",
        };
        let text = generate_text(&engine, vec![ChatMessage::user("q")])
            .await
            .unwrap();
        assert_eq!(text, "Least privilege.");
    }

    #[tokio::test]
    async fn test_generate_falls_back_when_stream_is_empty() {
        let engine = ScriptedEngine {
            tokens: vec![],
            fallback: "fallback answer",
        };
        let text = generate_text(&engine, vec![ChatMessage::user("q")])
            .await
            .unwrap();
        assert_eq!(text, "fallback answer");
    }

    #[tokio::test]
    async fn test_generate_empty_everywhere_is_an_error() {
        let engine = ScriptedEngine {
            tokens: vec![],
            fallback: "",
        };
        let err = generate_text(&engine, vec![ChatMessage::user("q")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyGeneration));
    }

    #[tokio::test]
    async fn test_null_engine_fails_explicitly() {
        let err = generate_text(&NullEngine, vec![ChatMessage::user("q")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(!NullEngine.is_ready());
    }
}
