//! Mention resolution
//!
//! Maps parsed mention tokens to stable note ids by scanning the owner's note
//! list. Tokens stamped with a `data-id` resolve by id; everything else falls
//! back to case-insensitive title matching. Unresolved tokens are dropped
//! silently.

use crate::models::{MentionToken, Note};
use std::collections::BTreeSet;

/// First note (in list order) whose title equals `label`, ignoring case
///
/// Duplicate titles resolve to whichever note appears first. Comparison uses
/// Unicode lowercase only; no diacritic or normalization folding is applied.
///
/// # Examples
///
/// ```
/// # use notelink_core::models::Note;
/// # use notelink_core::services::title_resolver::resolve_mention;
/// let notes = vec![Note::new_with_id("n1", "u", "note1", "")];
/// assert_eq!(resolve_mention("Note1", &notes).map(|n| n.id.as_str()), Some("n1"));
/// assert!(resolve_mention("Note2", &notes).is_none());
/// ```
pub fn resolve_mention<'a>(label: &str, notes: &'a [Note]) -> Option<&'a Note> {
    let wanted = label.to_lowercase();
    notes.iter().find(|note| note.title.to_lowercase() == wanted)
}

/// Resolve a token, preferring its stable id over its display text
///
/// An id that no longer names a note in `notes` (e.g. the target was deleted)
/// falls back to title matching so a retitled copy can still be found.
pub fn resolve_token<'a>(token: &MentionToken, notes: &'a [Note]) -> Option<&'a Note> {
    if let Some(id) = token.note_id.as_deref() {
        if let Some(note) = notes.iter().find(|note| note.id == id) {
            return Some(note);
        }
    }

    resolve_mention(&token.label, notes)
}

/// Deduplicated set of target note ids for a list of tokens
pub fn resolve_targets(tokens: &[MentionToken], notes: &[Note]) -> BTreeSet<String> {
    tokens
        .iter()
        .filter_map(|token| match resolve_token(token, notes) {
            Some(note) => Some(note.id.clone()),
            None => {
                tracing::debug!("Mention '{}' did not resolve to a note", token.label);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> Vec<Note> {
        vec![
            Note::new_with_id("n1", "u1", "Project Plan", ""),
            Note::new_with_id("n2", "u1", "project plan", ""),
            Note::new_with_id("n3", "u1", "Ideas", ""),
        ]
    }

    #[test]
    fn test_case_insensitive_exact_match() {
        let notes = notes();
        assert_eq!(resolve_mention("IDEAS", &notes).unwrap().id, "n3");
        assert!(resolve_mention("Idea", &notes).is_none());
        assert!(resolve_mention("Ideas ", &notes).is_none());
    }

    #[test]
    fn test_duplicate_titles_resolve_to_first() {
        let notes = notes();
        assert_eq!(resolve_mention("PROJECT PLAN", &notes).unwrap().id, "n1");
    }

    #[test]
    fn test_stable_id_wins_over_title() {
        let notes = notes();
        let token = MentionToken::with_id("Ideas", "n2");
        assert_eq!(resolve_token(&token, &notes).unwrap().id, "n2");
    }

    #[test]
    fn test_unknown_id_falls_back_to_title() {
        let notes = notes();
        let token = MentionToken::with_id("Ideas", "deleted-note");
        assert_eq!(resolve_token(&token, &notes).unwrap().id, "n3");

        let token = MentionToken::with_id("Gone", "deleted-note");
        assert!(resolve_token(&token, &notes).is_none());
    }

    #[test]
    fn test_resolve_targets_dedups_and_drops_misses() {
        let notes = notes();
        let tokens = vec![
            MentionToken::label("ideas"),
            MentionToken::label("Ideas"),
            MentionToken::label("Nowhere"),
            MentionToken::label("project plan"),
        ];

        let targets = resolve_targets(&tokens, &notes);
        let expected: BTreeSet<String> = ["n1", "n3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(targets, expected);
    }

    #[test]
    fn test_unicode_lowercase() {
        let notes = vec![Note::new_with_id("n1", "u1", "ÉTÉ", "")];
        assert!(resolve_mention("été", &notes).is_some());
        // No diacritic folding
        assert!(resolve_mention("ete", &notes).is_none());
    }
}
