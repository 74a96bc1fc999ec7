//! Flashcard generation and spaced-repetition scheduling.
//!
//! Cards are generated by the model (with a deterministic fallback built
//! from passage summaries) and reviewed on a simplified SM-2 schedule. The
//! deck itself is in-memory; every type serializes so the embedding
//! application can persist decks however it likes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use lectern_chat::{generate_text, ChatEngine, ChatMessage};
use lectern_core::{BudgetConfig, Result};
use lectern_index::{IndexedPassage, NoteIndex};
use lectern_retrieve::{build_budgeted_context, ContextEntry};

use crate::json::extract_json_array;

/// User's self-assessment after seeing a card's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewRating {
    Again,
    Good,
    Easy,
}

/// A single flashcard with spaced-repetition scheduling metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,
    pub topic: String,
    pub tags: Vec<String>,
    /// Current review interval in days.
    #[serde(rename = "intervalDays")]
    pub interval_days: u32,
    /// SM-2-style ease factor (higher = longer intervals).
    pub ease: f32,
    #[serde(rename = "dueAt")]
    pub due_at: DateTime<Utc>,
    pub seen: u32,
}

impl Flashcard {
    fn new(
        front: String,
        back: String,
        topic: String,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            front,
            back,
            topic,
            tags,
            interval_days: 1,
            ease: 2.3,
            due_at: now,
            seen: 0,
        }
    }

    /// Apply a review rating and reschedule the card.
    pub fn rate(&mut self, rating: ReviewRating, now: DateTime<Utc>) {
        self.seen += 1;
        match rating {
            ReviewRating::Again => {
                self.interval_days = 1;
                self.ease = (self.ease - 0.2).max(1.5);
            }
            ReviewRating::Good => {
                self.interval_days =
                    ((self.interval_days as f32 * self.ease).round() as u32).max(1);
                self.ease = (self.ease + 0.05).min(2.8);
            }
            ReviewRating::Easy => {
                self.interval_days =
                    ((self.interval_days as f32 * (self.ease + 0.45)).round() as u32).max(2);
                self.ease = (self.ease + 0.1).min(3.0);
            }
        }
        self.due_at = now + Duration::days(self.interval_days as i64);
    }
}

/// Deck export payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckExport {
    pub version: u32,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub cards: Vec<Flashcard>,
}

/// An in-memory flashcard deck.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Flashcard>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Flashcard>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards due at `now`, soonest first.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<&Flashcard> {
        let mut due: Vec<&Flashcard> = self.cards.iter().filter(|c| c.due_at <= now).collect();
        due.sort_by_key(|c| c.due_at);
        due
    }

    pub fn add(&mut self, cards: Vec<Flashcard>) {
        self.cards.extend(cards);
    }

    /// Rate the card with the given id. Returns false when it is not in the
    /// deck.
    pub fn rate(&mut self, id: &str, rating: ReviewRating, now: DateTime<Utc>) -> bool {
        match self.cards.iter_mut().find(|c| c.id == id) {
            Some(card) => {
                card.rate(rating, now);
                true
            }
            None => false,
        }
    }

    /// Merge imported cards, skipping any whose front/back pair is already
    /// present. Returns the number actually added.
    pub fn import(&mut self, cards: Vec<Flashcard>) -> usize {
        let mut known: Vec<String> = self
            .cards
            .iter()
            .map(|c| format!("{}::{}", c.front, c.back))
            .collect();
        let mut added = 0;
        for card in cards {
            let key = format!("{}::{}", card.front, card.back);
            if known.contains(&key) {
                continue;
            }
            known.push(key);
            self.cards.push(card);
            added += 1;
        }
        added
    }

    pub fn export(&self, now: DateTime<Utc>) -> DeckExport {
        DeckExport {
            version: 1,
            exported_at: now,
            cards: self.cards.clone(),
        }
    }

    /// Remove a card by id. Returns false when it is not in the deck.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        self.cards.len() != before
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }
}

#[derive(Debug, Clone)]
pub struct FlashcardConfig {
    pub count: usize,
    /// Focus phrase matched against heading and text; empty means the whole
    /// document.
    pub focus: String,
}

impl Default for FlashcardConfig {
    fn default() -> Self {
        Self {
            count: 8,
            focus: String::new(),
        }
    }
}

/// Card shape the model is asked to produce.
#[derive(Debug, Clone, Deserialize)]
struct RawCard {
    front: String,
    back: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Number of passages handed to the model as context.
const CONTEXT_CHUNKS: usize = 12;

pub struct FlashcardGenerator {
    index: Arc<NoteIndex>,
    engine: Arc<dyn ChatEngine>,
}

impl FlashcardGenerator {
    pub fn new(index: Arc<NoteIndex>, engine: Arc<dyn ChatEngine>) -> Self {
        Self { index, engine }
    }

    /// Generate flashcards, falling back to deterministic summary cards when
    /// the model output is unusable. Engine errors propagate.
    pub async fn generate(
        &self,
        cfg: &FlashcardConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>> {
        let index = self.index.load().await;
        let focus = cfg.focus.trim().to_lowercase();

        let context_chunks: Vec<&IndexedPassage> = index
            .passages()
            .iter()
            .filter(|p| focus.is_empty() || p.haystack.contains(&focus))
            .take(CONTEXT_CHUNKS)
            .collect();

        let context = if context_chunks.is_empty() {
            "No note chunks available from the embeddings artifact. Generate from the \
             course's general subject matter."
                .to_string()
        } else {
            let entries: Vec<ContextEntry> =
                context_chunks.iter().map(|c| ContextEntry::from(*c)).collect();
            build_budgeted_context(&entries, &BudgetConfig::default(), None)
        };

        let focus_line = if cfg.focus.trim().is_empty() {
            String::new()
        } else {
            format!(" Focus strongly on: {}.", cfg.focus.trim())
        };
        let prompt = format!(
            "Generate exactly {} study flashcards for the course.{}\n\
             Return ONLY JSON as an array of objects with this shape:\n\
             [\n  {{\"front\":\"...\",\"back\":\"...\",\"topic\":\"...\",\"tags\":[\"...\"]}}\n]\n\
             Keep each front concise and each back accurate but short.",
            cfg.count, focus_line
        );

        let response = generate_text(
            self.engine.as_ref(),
            vec![
                ChatMessage::system(
                    "You create high-quality study flashcards. Return only valid JSON. \
                     No markdown, no prose outside JSON.",
                ),
                ChatMessage::user(format!("Context:\n{context}\n\n{prompt}")),
            ],
        )
        .await?;

        let parsed: Vec<RawCard> = extract_json_array(&response);
        debug!(parsed = parsed.len(), "parsed model flashcards");

        let mut cards = normalize_cards(parsed, now);
        cards.truncate(cfg.count);
        if cards.is_empty() {
            warn!("model output had no usable cards, building deterministic fallback");
            cards = normalize_cards(fallback_cards(index.passages(), cfg), now);
            cards.truncate(cfg.count);
        }
        Ok(cards)
    }
}

/// Trim, validate, and stamp raw cards into scheduled flashcards.
fn normalize_cards(raw: Vec<RawCard>, now: DateTime<Utc>) -> Vec<Flashcard> {
    raw.into_iter()
        .filter(|c| !c.front.trim().is_empty() && !c.back.trim().is_empty())
        .map(|c| {
            Flashcard::new(
                c.front.trim().to_string(),
                c.back.trim().to_string(),
                c.topic
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or("General")
                    .to_string(),
                c.tags.unwrap_or_default(),
                now,
            )
        })
        .collect()
}

/// Generic study-method cards used to pad a thin fallback deck.
const GENERIC_CARDS: &[(&str, &str, &str)] = &[
    (
        "Why does spacing reviews out improve retention?",
        "Spaced repetition revisits material just before it would be forgotten, which \
         strengthens long-term recall.",
        "Study Skills",
    ),
    (
        "What makes active recall more effective than rereading?",
        "Retrieving an answer from memory strengthens it far more than passively \
         recognizing it on the page.",
        "Study Skills",
    ),
    (
        "Why write flashcards in your own words?",
        "Rephrasing forces understanding; cards copied verbatim test recognition \
         instead of recall.",
        "Study Skills",
    ),
    (
        "When should a flashcard be split in two?",
        "When the answer contains more than one independent fact — each card should \
         test exactly one thing.",
        "Study Skills",
    ),
];

/// Build summary cards straight from the passages, padded with generic study
/// cards when the notes run out.
fn fallback_cards(passages: &[IndexedPassage], cfg: &FlashcardConfig) -> Vec<RawCard> {
    let target = cfg.count.max(1);
    let focus = cfg.focus.trim().to_lowercase();

    let selected: Vec<&IndexedPassage> = {
        let matching: Vec<&IndexedPassage> = passages
            .iter()
            .filter(|p| focus.is_empty() || p.haystack.contains(&focus))
            .collect();
        if matching.is_empty() {
            passages.iter().collect()
        } else {
            matching
        }
    };

    let mut cards: Vec<RawCard> = Vec::new();
    for chunk in selected {
        if cards.len() >= target {
            break;
        }
        let Some(summary) = summary_sentence(&chunk.text) else {
            continue;
        };
        cards.push(RawCard {
            front: format!("What is the key idea in {}?", chunk.heading),
            back: summary,
            topic: Some(chunk.heading.clone()),
            tags: Some(vec!["notes".to_string(), format!("page-{}", chunk.page)]),
        });
    }

    let mut generic_index = 0;
    while cards.len() < target {
        let (front, back, topic) = GENERIC_CARDS[generic_index % GENERIC_CARDS.len()];
        cards.push(RawCard {
            front: front.to_string(),
            back: back.to_string(),
            topic: Some(topic.to_string()),
            tags: Some(vec!["study-skills".to_string()]),
        });
        generic_index += 1;
    }

    cards.truncate(target);
    cards
}

/// First substantial sentence of a passage, capped at 200 characters.
fn summary_sentence(text: &str) -> Option<String> {
    let sentence = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .find(|s| s.len() > 24)
        .map(|s| s.chars().take(200).collect::<String>());

    match sentence {
        Some(s) => Some(s),
        None => {
            let head: String = text.chars().take(180).collect();
            let head = head.trim().to_string();
            if head.is_empty() {
                None
            } else {
                Some(head)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lectern_chat::{BoxedTokenStream, StreamChunk};
    use lectern_index::{ArtifactSource, FetchError};

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn card(front: &str, back: &str) -> Flashcard {
        Flashcard::new(
            front.to_string(),
            back.to_string(),
            "General".to_string(),
            Vec::new(),
            now(),
        )
    }

    #[test]
    fn test_rate_again_resets_interval_and_lowers_ease() {
        let mut c = card("f", "b");
        c.rate(ReviewRating::Again, now());
        assert_eq!(c.interval_days, 1);
        assert!((c.ease - 2.1).abs() < 1e-6);
        assert_eq!(c.seen, 1);
        assert_eq!(c.due_at, now() + Duration::days(1));
    }

    #[test]
    fn test_rate_good_scales_interval_by_ease() {
        let mut c = card("f", "b");
        c.rate(ReviewRating::Good, now());
        // 1 day * 2.3 ease rounds to 2 days; ease rises to 2.35.
        assert_eq!(c.interval_days, 2);
        assert!((c.ease - 2.35).abs() < 1e-6);
        assert_eq!(c.due_at, now() + Duration::days(2));
    }

    #[test]
    fn test_rate_easy_grows_fastest() {
        let mut c = card("f", "b");
        c.rate(ReviewRating::Easy, now());
        // 1 day * (2.3 + 0.45) rounds to 3 days.
        assert_eq!(c.interval_days, 3);
        assert!((c.ease - 2.4).abs() < 1e-6);
    }

    #[test]
    fn test_ease_is_clamped() {
        let mut c = card("f", "b");
        for _ in 0..10 {
            c.rate(ReviewRating::Again, now());
        }
        assert!((c.ease - 1.5).abs() < 1e-6);

        let mut c = card("f", "b");
        for _ in 0..30 {
            c.rate(ReviewRating::Easy, now());
        }
        assert!((c.ease - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_due_sorting_and_filtering() {
        let mut deck = Deck::new();
        let mut early = card("early", "b");
        early.due_at = now() - Duration::days(2);
        let mut later = card("later", "b");
        later.due_at = now() - Duration::days(1);
        let mut future = card("future", "b");
        future.due_at = now() + Duration::days(5);
        deck.add(vec![later, early, future]);

        let due = deck.due(now());
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].front, "early");
        assert_eq!(due[1].front, "later");
    }

    #[test]
    fn test_import_dedupes_on_front_back() {
        let mut deck = Deck::from_cards(vec![card("f1", "b1")]);
        let added = deck.import(vec![card("f1", "b1"), card("f2", "b2")]);
        assert_eq!(added, 1);
        assert_eq!(deck.len(), 2);
    }

    #[test]
    fn test_delete_and_clear() {
        let c = card("f", "b");
        let id = c.id.clone();
        let mut deck = Deck::from_cards(vec![c]);
        assert!(deck.delete(&id));
        assert!(!deck.delete(&id));
        deck.add(vec![card("g", "b")]);
        deck.clear();
        assert!(deck.is_empty());
    }

    #[test]
    fn test_normalize_cards_filters_blanks() {
        let cards = normalize_cards(
            vec![
                RawCard {
                    front: "  ".to_string(),
                    back: "b".to_string(),
                    topic: None,
                    tags: None,
                },
                RawCard {
                    front: "f".to_string(),
                    back: "b".to_string(),
                    topic: Some(" Access Control ".to_string()),
                    tags: None,
                },
            ],
            now(),
        );
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].topic, "Access Control");
        assert_eq!(cards[0].interval_days, 1);
        assert!((cards[0].ease - 2.3).abs() < 1e-6);
    }

    #[test]
    fn test_summary_sentence() {
        assert_eq!(
            summary_sentence("Tiny. Least privilege grants only the minimum access necessary. More."),
            Some("Least privilege grants only the minimum access necessary".to_string())
        );
        assert_eq!(summary_sentence(""), None);
    }

    // --- async generator tests -------------------------------------------

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
        "text":"Least privilege grants only the minimum access necessary for every component, which keeps the blast radius of a compromise small.",
        "page":4,"heading":"Access Control","embedding":[1.0]}]}"#;

    fn generator(engine_output: &'static str) -> FlashcardGenerator {
        let index = Arc::new(NoteIndex::new(InMemorySource(ARTIFACT.to_string())));
        FlashcardGenerator::new(index, Arc::new(ScriptedEngine(engine_output)))
    }

    #[tokio::test]
    async fn test_generate_uses_model_cards() {
        let generator = generator(r#"[{"front":"What is least privilege?","back":"Minimum access.","topic":"Access Control","tags":["notes"]}]"#);
        let cards = generator
            .generate(&FlashcardConfig { count: 3, focus: String::new() }, now())
            .await
            .unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].front, "What is least privilege?");
        assert_eq!(cards[0].due_at, now());
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_garbage_output() {
        let generator = generator("no json here");
        let cards = generator
            .generate(&FlashcardConfig { count: 3, focus: String::new() }, now())
            .await
            .unwrap();
        assert_eq!(cards.len(), 3);
        // First card summarizes the only passage; the rest are generic pads.
        assert!(cards[0].front.contains("Access Control"));
        assert_eq!(cards[1].topic, "Study Skills");
    }

    #[tokio::test]
    async fn test_generate_with_focus_filter() {
        let generator = generator("no json here");
        let cards = generator
            .generate(
                &FlashcardConfig { count: 1, focus: "least privilege".to_string() },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].topic, "Access Control");
    }
}
