//! Connection (edge) model
//!
//! A connection is a persisted, directed, owner-scoped record `from -> to`
//! derived from a mention in the `from` note's content. No uniqueness is
//! enforced on `(from, to)`: accepting the same suggestion twice yields two
//! connections, and both are treated alike by reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Edge identifier
    pub id: String,

    /// Owning user id (same owner as the `from` note)
    pub owner: String,

    /// Source note id (the note whose content holds the mention)
    pub from: String,

    /// Target note id
    pub to: String,

    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(owner: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.into(),
            from: from.into(),
            to: to.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_json_contract() {
        let conn = Connection::new("user-1", "note-a", "note-b");
        let json = serde_json::to_value(&conn).unwrap();

        assert_eq!(json["owner"], "user-1");
        assert_eq!(json["from"], "note-a");
        assert_eq!(json["to"], "note-b");
        assert!(json.get("createdAt").is_some());

        let back: Connection = serde_json::from_value(json).unwrap();
        assert_eq!(back, conn);
    }
}
