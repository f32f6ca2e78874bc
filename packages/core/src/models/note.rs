//! Note Data Structures
//!
//! A `Note` is a free-form document owned by a single user. Its `content` is the
//! serialized rich text emitted by the editor; inline mention elements inside
//! that content implicitly define outgoing connections to other notes.
//!
//! # Examples
//!
//! ```rust
//! use notelink_core::models::Note;
//!
//! let content = r#"<p>Start with <span data-type="mention">@Rust</span></p>"#;
//! let note = Note::new("user-1", "Reading list", content);
//! assert_eq!(note.owner, "user-1");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-authored note.
///
/// Titles are mutable and not guaranteed unique; `id` is the only stable
/// identifier and never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Stable identifier (UUID v4)
    pub id: String,

    /// Display title, matched case-insensitively by mention resolution
    pub title: String,

    /// Serialized rich-text content
    pub content: String,

    /// Owning user id
    pub owner: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Create a new note with a generated id and the current timestamp
    pub fn new(
        owner: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), owner, title, content)
    }

    /// Create a note with a caller-supplied id
    pub fn new_with_id(
        id: impl Into<String>,
        owner: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            owner: owner.into(),
            created_at: Utc::now(),
        }
    }
}

/// A mention reference extracted from note content.
///
/// `label` is the display text with its leading sigil removed. `note_id` is set
/// when the editor stamped the stable target id onto the mention element at
/// insertion time; older content only carries the label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionToken {
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
}

impl MentionToken {
    /// Token that can only be resolved by title
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            note_id: None,
        }
    }

    /// Token carrying the stable id of its target
    pub fn with_id(label: impl Into<String>, note_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            note_id: Some(note_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_serializes_camel_case() {
        let note = Note::new_with_id("n-1", "user-1", "Title", "<p>body</p>");
        let json = serde_json::to_value(&note).unwrap();

        assert_eq!(json["id"], "n-1");
        assert_eq!(json["owner"], "user-1");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_new_generates_distinct_ids() {
        let a = Note::new("user-1", "A", "");
        let b = Note::new("user-1", "A", "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_mention_token_omits_missing_id() {
        let json = serde_json::to_value(MentionToken::label("Rust")).unwrap();
        assert_eq!(json["label"], "Rust");
        assert!(json.get("noteId").is_none());

        let json = serde_json::to_value(MentionToken::with_id("Rust", "n-9")).unwrap();
        assert_eq!(json["noteId"], "n-9");
    }
}
