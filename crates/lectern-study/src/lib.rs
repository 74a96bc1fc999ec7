//! Lectern Study — quiz and flashcard generation over the note index.
//!
//! Both generators follow the same shape: retrieve passages, hand a budgeted
//! context to the chat engine with a strict-JSON prompt, rescue what parses,
//! and fall back to deterministic generation when the model output is
//! unusable.

pub mod flashcards;
pub mod json;
pub mod quiz;
pub mod rng;

pub use flashcards::{
    Deck, DeckExport, Flashcard, FlashcardConfig, FlashcardGenerator, ReviewRating,
};
pub use json::extract_json_array;
pub use quiz::{Difficulty, DifficultyMode, QuizConfig, QuizGenerator, QuizQuestion};
pub use rng::SeededRng;
