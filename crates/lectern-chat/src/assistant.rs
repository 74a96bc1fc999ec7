//! RAG study assistant — retrieval-grounded chat over the note index.
//!
//! Turns are serialized: the conversation lock is held across the whole
//! retrieval-plus-generation cycle, so concurrent callers queue up and are
//! handled one at a time.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use lectern_core::{BudgetConfig, Result, RetrievalConfig};
use lectern_index::NoteIndex;
use lectern_retrieve::{build_budgeted_context, search_by_text, ContextEntry};

use crate::engine::{generate_text, ChatEngine};
use crate::types::ChatMessage;

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful study assistant for a lecture-notes course. Answer based on \
     the provided notes context when available. If context is missing, say that the \
     note embeddings are not loaded and provide a best-effort answer.";

/// A retrieved passage cited alongside an answer.
#[derive(Debug, Clone)]
pub struct SourceRef {
    pub text: String,
    pub page: u32,
    pub heading: String,
}

/// A completed assistant turn.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Chat consumer: loads the index, retrieves context for each question, and
/// grounds the engine's answer in it.
pub struct StudyAssistant {
    index: Arc<NoteIndex>,
    engine: Arc<dyn ChatEngine>,
    system_prompt: String,
    retrieval: RetrievalConfig,
    budget: BudgetConfig,
    history: Mutex<Vec<ChatMessage>>,
}

impl StudyAssistant {
    pub fn new(index: Arc<NoteIndex>, engine: Arc<dyn ChatEngine>) -> Self {
        Self {
            index,
            engine,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            retrieval: RetrievalConfig::default(),
            budget: BudgetConfig::default(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Replace the default system prompt (e.g. to name the course).
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Answer a question grounded in retrieved note passages.
    pub async fn ask(&self, question: &str) -> Result<AssistantReply> {
        // Serializes turns: at most one retrieval-plus-generation cycle runs
        // at a time.
        let mut history = self.history.lock().await;

        let index = self.index.load().await;
        let results = search_by_text(index.passages(), question, self.retrieval.top_k);
        debug!(hits = results.len(), "retrieved context for question");

        let sources: Vec<SourceRef> = results
            .iter()
            .map(|r| SourceRef {
                text: r.text.clone(),
                page: r.page,
                heading: r.heading.clone(),
            })
            .collect();

        let context = if !results.is_empty() {
            let entries: Vec<ContextEntry> = results.iter().map(ContextEntry::from).collect();
            build_budgeted_context(&entries, &self.budget, Some(&chat_format))
        } else if let Some(error) = index.load_error() {
            format!("No note context available. {error}")
        } else {
            "No note context available from the embeddings artifact.".to_string()
        };

        let messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(format!(
                "Context from class notes:\n{context}\n\nQuestion: {question}"
            )),
        ];

        let answer = generate_text(self.engine.as_ref(), messages).await?;

        history.push(ChatMessage::user(question));
        history.push(ChatMessage::assistant(&answer));

        Ok(AssistantReply { answer, sources })
    }

    /// The conversation so far, in turn order.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }
}

fn chat_format(entry: &ContextEntry, index: usize) -> String {
    format!(
        "[{index}] (Page {}, {}): {}",
        entry.page, entry.heading, entry.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lectern_index::{ArtifactSource, FetchError};
    use lectern_retrieve::search_by_text;

    use crate::types::{BoxedTokenStream, StreamChunk};

    struct InMemorySource(String);

    #[async_trait]
    impl ArtifactSource for InMemorySource {
        async fn fetch(&self) -> std::result::Result<String, FetchError> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "memory://embeddings.json".to_string()
        }
    }

    struct ScriptedEngine(&'static str);

    #[async_trait]
    impl ChatEngine for ScriptedEngine {
        fn stream_chat(&self, _messages: Vec<ChatMessage>) -> BoxedTokenStream {
            Box::pin(tokio_stream::iter(vec![
                StreamChunk::Token(self.0.to_string()),
                StreamChunk::Done { tokens_used: 1 },
            ]))
        }

        async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    const ARTIFACT: &str = r#"{"chunks":[{
        "text":"Least privilege grants only the minimum access necessary.",
        "page":4,"heading":"Access Control","embedding":[1.0,0.0]}]}"#;

    fn assistant(artifact: &str) -> StudyAssistant {
        let index = Arc::new(NoteIndex::new(InMemorySource(artifact.to_string())));
        StudyAssistant::new(index, Arc::new(ScriptedEngine("Grounded answer.")))
    }

    #[tokio::test]
    async fn test_ask_returns_answer_with_sources() {
        let assistant = assistant(ARTIFACT);
        let reply = assistant.ask("what is least privilege?").await.unwrap();
        assert_eq!(reply.answer, "Grounded answer.");
        assert_eq!(reply.sources.len(), 1);
        assert_eq!(reply.sources[0].page, 4);
        assert_eq!(reply.sources[0].heading, "Access Control");

        let history = assistant.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
    }

    #[tokio::test]
    async fn test_ask_with_empty_index_still_answers() {
        let assistant = assistant(r#"{"chunks":[]}"#);
        let reply = assistant.ask("anything at all").await.unwrap();
        assert_eq!(reply.answer, "Grounded answer.");
        assert!(reply.sources.is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        // Full pipeline: one passage, lexical retrieval scores 1.0, and the
        // default-formatted context is a single exact line.
        let index = NoteIndex::new(InMemorySource(ARTIFACT.to_string()));
        let loaded = index.load().await;

        let results = search_by_text(loaded.passages(), "least privilege", 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);

        let entries: Vec<ContextEntry> = results.iter().map(ContextEntry::from).collect();
        let context = build_budgeted_context(&entries, &BudgetConfig::default(), None);
        assert_eq!(
            context,
            "[1] (Access Control, p.4) Least privilege grants only the minimum access necessary."
        );
    }
}
