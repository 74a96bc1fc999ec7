//! Quiz generation: model-written questions with a deterministic fallback.
//!
//! The model path asks for strict JSON and rescues what it can; when nothing
//! usable comes back, cloze and topic questions are built directly from the
//! retrieved passages with seeded shuffles, so a given (notes, seed) pair
//! always yields the same quiz.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lectern_chat::{generate_text, ChatEngine, ChatMessage};
use lectern_core::{BudgetConfig, Error, Result};
use lectern_index::{IndexedPassage, NoteIndex};
use lectern_retrieve::{build_budgeted_context, ContextEntry};

use crate::json::extract_json_array;
use crate::rng::SeededRng;

/// Difficulty of a generated question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Requested difficulty, including a mixed mode resolved per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyMode {
    Easy,
    Medium,
    Hard,
    Mixed,
}

/// A multiple-choice question with four lettered options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctIndex")]
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub topic: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    pub num_questions: usize,
    pub difficulty: DifficultyMode,
    /// Topic filter against passage headings; empty means the whole document.
    pub topics: Vec<String>,
    /// Seed for chunk selection and option shuffles.
    #[serde(default)]
    pub seed: u64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            num_questions: 5,
            difficulty: DifficultyMode::Mixed,
            topics: Vec::new(),
            seed: 0,
        }
    }
}

/// Number of passages handed to the model as context.
const CONTEXT_CHUNKS: usize = 12;

/// Stock distractors used when the notes yield fewer than three.
const GENERIC_DISTRACTORS: &[&str] =
    &["Authentication", "Encryption", "Validation", "Authorization"];

pub struct QuizGenerator {
    index: Arc<NoteIndex>,
    engine: Arc<dyn ChatEngine>,
}

impl QuizGenerator {
    pub fn new(index: Arc<NoteIndex>, engine: Arc<dyn ChatEngine>) -> Self {
        Self { index, engine }
    }

    /// Generate a quiz. Model failures to produce parseable questions fall
    /// back to deterministic generation; an engine error propagates.
    pub async fn generate(&self, cfg: &QuizConfig) -> Result<Vec<QuizQuestion>> {
        let index = self.index.load().await;
        let mut rng = SeededRng::new(cfg.seed);
        let chunks = gather_chunks(index.passages(), &cfg.topics, &mut rng);

        let response = generate_text(self.engine.as_ref(), self.build_messages(&chunks, cfg)).await?;

        let mut questions: Vec<QuizQuestion> = extract_json_array(&response);
        questions.retain(is_well_formed);
        debug!(parsed = questions.len(), "parsed model questions");

        if questions.is_empty() {
            warn!("model output had no usable questions, using deterministic fallback");
            questions = generate_fallback(&chunks, cfg);
        }

        questions.truncate(cfg.num_questions);
        if questions.is_empty() {
            return Err(Error::Generation(
                "unable to generate quiz questions from the current notes".to_string(),
            ));
        }
        Ok(questions)
    }

    fn build_messages(&self, chunks: &[&IndexedPassage], cfg: &QuizConfig) -> Vec<ChatMessage> {
        let context_chunks = &chunks[..chunks.len().min(CONTEXT_CHUNKS)];
        let context = if context_chunks.is_empty() {
            "No extracted note chunks available. Generate questions from the course's \
             general subject matter."
                .to_string()
        } else {
            let entries: Vec<ContextEntry> =
                context_chunks.iter().map(|c| ContextEntry::from(*c)).collect();
            build_budgeted_context(&entries, &BudgetConfig::default(), Some(&quiz_format))
        };

        let difficulty_instruction = match cfg.difficulty {
            DifficultyMode::Mixed => "Mix easy, medium, and hard questions.".to_string(),
            DifficultyMode::Easy => "All questions should be easy difficulty.".to_string(),
            DifficultyMode::Medium => "All questions should be medium difficulty.".to_string(),
            DifficultyMode::Hard => "All questions should be hard difficulty.".to_string(),
        };

        let prompt = format!(
            "Based on the following class notes context, generate exactly {} multiple \
             choice questions. {}\n\n\
             Each question must have exactly 4 options (A, B, C, D) with one correct answer.\n\n\
             Respond ONLY with valid JSON in this exact format:\n\
             [\n  {{\n    \"question\": \"...\",\n    \"options\": [\"A) ...\", \"B) ...\", \
             \"C) ...\", \"D) ...\"],\n    \"correctIndex\": 0,\n    \"explanation\": \"...\",\n    \
             \"topic\": \"...\",\n    \"difficulty\": \"easy|medium|hard\"\n  }}\n]\n\n\
             Context:\n{}",
            cfg.num_questions, difficulty_instruction, context
        );

        vec![
            ChatMessage::system(
                "You are a quiz generator for a lecture-notes course. Generate multiple \
                 choice questions based on the provided context. Respond only with valid JSON.",
            ),
            ChatMessage::user(prompt),
        ]
    }
}

fn quiz_format(entry: &ContextEntry, index: usize) -> String {
    format!(
        "[{index}] ({}, Page {}): {}",
        entry.heading, entry.page, entry.text
    )
}

fn is_well_formed(question: &QuizQuestion) -> bool {
    !question.question.trim().is_empty()
        && question.options.len() == 4
        && question.correct_index < 4
}

/// Select and seed-shuffle the candidate passages, honoring the topic filter
/// when it matches anything.
fn gather_chunks<'a>(
    passages: &'a [IndexedPassage],
    topics: &[String],
    rng: &mut SeededRng,
) -> Vec<&'a IndexedPassage> {
    let mut selected: Vec<&IndexedPassage> = if topics.is_empty() {
        passages.iter().collect()
    } else {
        let filtered: Vec<&IndexedPassage> = passages
            .iter()
            .filter(|p| {
                topics
                    .iter()
                    .any(|t| p.heading.to_lowercase().contains(&t.to_lowercase()))
            })
            .collect();
        if filtered.is_empty() {
            passages.iter().collect()
        } else {
            filtered
        }
    };
    rng.shuffle(&mut selected);
    selected
}

/// Build questions directly from passages when the model path yields nothing.
fn generate_fallback(chunks: &[&IndexedPassage], cfg: &QuizConfig) -> Vec<QuizQuestion> {
    let key_terms = extract_key_terms(chunks);
    let mut questions = Vec::new();

    for (i, chunk) in chunks.iter().enumerate() {
        if questions.len() >= cfg.num_questions {
            break;
        }
        if let Some(q) =
            question_from_chunk(chunk, &key_terms, cfg.difficulty, cfg.seed.wrapping_add(i as u64))
        {
            questions.push(q);
        }
    }

    // Second pass with offset seeds when the first pass came up short: a
    // different sentence is picked from each chunk.
    if questions.len() < cfg.num_questions {
        for (i, chunk) in chunks.iter().enumerate() {
            if questions.len() >= cfg.num_questions {
                break;
            }
            if let Some(q) = question_from_chunk(
                chunk,
                &key_terms,
                cfg.difficulty,
                cfg.seed.wrapping_add(100 + i as u64),
            ) {
                questions.push(q);
            }
        }
    }

    questions
}

static DEFINITION_TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-zA-Z\s]{2,30})\b\s+(?:is|are|refers to|means)").unwrap());
static CAPITALIZED_TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b").unwrap());
static QUOTED_TERM: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static CONCEPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][a-zA-Z\s]{2,25})\b\s+(?:is|are|refers to|means|provides)").unwrap()
});

/// Mine distractor-worthy terms: defined concepts, capitalized multi-word
/// phrases, quoted terms, and the headings themselves.
fn extract_key_terms(chunks: &[&IndexedPassage]) -> Vec<String> {
    fn add(terms: &mut Vec<String>, candidate: &str) {
        let candidate = candidate.trim();
        if candidate.len() > 2
            && candidate.len() < 50
            && !terms.iter().any(|t| t == candidate)
        {
            terms.push(candidate.to_string());
        }
    }

    let mut terms: Vec<String> = Vec::new();
    for chunk in chunks {
        for sentence in chunk.text.split(['.', '!', '?']) {
            if let Some(caps) = DEFINITION_TERM.captures(sentence) {
                add(&mut terms, &caps[1]);
            }
            for m in CAPITALIZED_TERM.find_iter(sentence) {
                add(&mut terms, m.as_str());
            }
            for caps in QUOTED_TERM.captures_iter(sentence) {
                add(&mut terms, &caps[1]);
            }
        }
        add(&mut terms, &chunk.heading);
    }
    terms
}

fn question_from_chunk(
    chunk: &IndexedPassage,
    all_terms: &[String],
    mode: DifficultyMode,
    seed: u64,
) -> Option<QuizQuestion> {
    let sentences: Vec<&str> = chunk
        .text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() > 20)
        .collect();
    let sentence = *sentences.get(seed as usize % sentences.len().max(1))?;

    let mut rng = SeededRng::new(seed);

    if let Some(caps) = CONCEPT.captures(sentence) {
        let key_term = caps[1].trim().to_string();
        let blanked = sentence.replacen(key_term.as_str(), "________", 1);

        let mut pool: Vec<&str> = all_terms
            .iter()
            .map(String::as_str)
            .filter(|t| !t.eq_ignore_ascii_case(&key_term) && *t != chunk.heading)
            .collect();
        rng.shuffle(&mut pool);
        let mut distractors: Vec<String> =
            pool.into_iter().take(3).map(str::to_string).collect();
        for generic in GENERIC_DISTRACTORS {
            if distractors.len() >= 3 {
                break;
            }
            if !generic.eq_ignore_ascii_case(&key_term)
                && !distractors.iter().any(|d| d == generic)
            {
                distractors.push(generic.to_string());
            }
        }
        if distractors.len() < 3 {
            return None;
        }

        let mut options: Vec<String> = Vec::with_capacity(4);
        options.push(key_term.clone());
        options.extend(distractors);
        rng.shuffle(&mut options);
        let correct_index = options.iter().position(|o| *o == key_term)?;

        return Some(QuizQuestion {
            question: format!("Complete the following from the class notes: \"{blanked}\""),
            options: letter_options(&options),
            correct_index,
            explanation: format!(
                "The correct answer is \"{key_term}\". From: {} (Page {}).",
                chunk.heading, chunk.page
            ),
            topic: chunk.heading.clone(),
            difficulty: resolve_difficulty(mode, seed),
        });
    }

    // No defined concept in the sentence: ask which topic covers it.
    let mut others: Vec<&String> = all_terms.iter().filter(|t| **t != chunk.heading).collect();
    rng.shuffle(&mut others);
    let others: Vec<String> = others.into_iter().take(3).cloned().collect();
    if others.len() < 3 {
        return None;
    }

    let mut options: Vec<String> = Vec::with_capacity(4);
    options.push(chunk.heading.clone());
    options.extend(others);
    rng.shuffle(&mut options);
    let correct_index = options.iter().position(|o| *o == chunk.heading)?;

    let snippet: String = sentence.chars().take(100).collect();
    Some(QuizQuestion {
        question: format!("Which topic covers the following concept: \"{snippet}...\"?"),
        options: letter_options(&options),
        correct_index,
        explanation: format!(
            "This concept is from the \"{}\" section (Page {}).",
            chunk.heading, chunk.page
        ),
        topic: chunk.heading.clone(),
        difficulty: resolve_difficulty(mode, seed),
    })
}

fn letter_options(options: &[String]) -> Vec<String> {
    options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}) {option}", (b'A' + i as u8) as char))
        .collect()
}

fn resolve_difficulty(mode: DifficultyMode, seed: u64) -> Difficulty {
    match mode {
        DifficultyMode::Easy => Difficulty::Easy,
        DifficultyMode::Medium => Difficulty::Medium,
        DifficultyMode::Hard => Difficulty::Hard,
        DifficultyMode::Mixed => [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
            [(seed % 3) as usize],
    }
}
