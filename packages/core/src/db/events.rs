//! Domain Events for the in-memory store
//!
//! The store emits these over a tokio broadcast channel whenever notes or
//! connections change, so sessions and views can react without being coupled
//! to the store implementation.
//!
//! # Event Flow
//!
//! 1. Store performs a mutation (create, update, delete)
//! 2. Domain event is emitted via broadcast channel
//! 3. Subscribers (e.g. `NoteSyncSession::watch_events`) receive it asynchronously

use crate::models::{Connection, Note};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A note was created or its title/content changed
    #[serde(rename = "note:upserted")]
    NoteUpserted(Note),

    #[serde(rename = "note:deleted")]
    NoteDeleted { id: String },

    #[serde(rename = "edge:created")]
    EdgeCreated(Connection),

    /// A connection was deleted; `from` identifies the note whose edge list changed
    #[serde(rename = "edge:deleted")]
    EdgeDeleted { id: String, from: String },
}

impl DomainEvent {
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::NoteUpserted(_) => "note:upserted",
            DomainEvent::NoteDeleted { .. } => "note:deleted",
            DomainEvent::EdgeCreated(_) => "edge:created",
            DomainEvent::EdgeDeleted { .. } => "edge:deleted",
        }
    }

    /// Source note whose outgoing connection list this event changed, if any
    pub fn edge_source(&self) -> Option<&str> {
        match self {
            DomainEvent::EdgeCreated(conn) => Some(conn.from.as_str()),
            DomainEvent::EdgeDeleted { from, .. } => Some(from.as_str()),
            _ => None,
        }
    }
}
