//! Lectern Ingest — page chunking, heading normalization, noise filters.

pub mod chunker;
pub mod heading;
pub mod noise;

pub use chunker::{Chunker, PageText, ProtoPassage};
pub use heading::{
    clean_heading, infer_heading_from_text, is_likely_heading, is_valid_topic,
    is_valid_topic_filtered, FALLBACK_HEADING, GENERAL_HEADING,
};
pub use noise::is_intro_or_toc;
