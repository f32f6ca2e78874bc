//! Utility functions for NoteLink Core
//!
//! Pure helpers shared across services.

pub mod mention_parser;

pub use mention_parser::{extract_mention_labels, extract_mentions, extract_mentions_with};
