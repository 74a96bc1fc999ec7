//! Lectern Retrieve — hybrid lexical/semantic search and context budgeting.

pub mod budget;
pub mod search;
pub mod similarity;

pub use budget::{build_budgeted_context, ContextEntry, ContextFormatter};
pub use search::{search, search_by_text, search_with, SearchResult};
pub use similarity::{fast_cosine, tokenize};
