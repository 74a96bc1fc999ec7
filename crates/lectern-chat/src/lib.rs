//! Lectern Chat — chat engine abstraction and the RAG study assistant.
//!
//! The language model itself lives outside this crate; consumers hand in any
//! [`ChatEngine`] implementation that can stream a chat completion.

pub mod assistant;
pub mod engine;
pub mod local;
pub mod types;

pub use assistant::{AssistantReply, SourceRef, StudyAssistant};
pub use engine::{generate_text, ChatEngine, NullEngine};
pub use local::LocalHttpEngine;
pub use types::{BoxedTokenStream, ChatMessage, StreamChunk};
