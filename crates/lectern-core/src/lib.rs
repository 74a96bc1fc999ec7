//! Lectern Core — configuration defaults and error taxonomy.

pub mod config;
pub mod error;

pub use config::{BudgetConfig, ChunkingConfig, RetrievalConfig, CHARS_PER_TOKEN};
pub use error::{Error, Result};
