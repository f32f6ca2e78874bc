//! Authoring-side connection operations
//!
//! When the user accepts a mention suggestion, the editor immediately records a
//! connection from the current note to the selected one. This is the only path
//! that creates connections; the sync engine only prunes them.
//!
//! Reads go through the shared `ConnectionCache` so the editor's connection
//! badge and the graph view see the same data the engine diffs against.

use crate::db::{EdgeStore, NoteDirectory};
use crate::models::Connection;
use crate::services::connection_cache::ConnectionCache;
use crate::services::error::SyncError;
use std::sync::Arc;

pub struct ConnectionService {
    edges: Arc<dyn EdgeStore>,
    notes: Arc<dyn NoteDirectory>,
    cache: Arc<ConnectionCache>,
}

impl ConnectionService {
    pub fn new(
        edges: Arc<dyn EdgeStore>,
        notes: Arc<dyn NoteDirectory>,
        cache: Arc<ConnectionCache>,
    ) -> Self {
        Self { edges, notes, cache }
    }

    /// Record a connection `from -> to` for an accepted mention suggestion
    ///
    /// Issues exactly one create call; no duplicate check is made. Both cache
    /// scopes are invalidated whether or not the create succeeded.
    pub async fn connect(&self, from: &str, to: &str) -> Result<Connection, SyncError> {
        if self.notes.get_note(from).await?.is_none() {
            return Err(SyncError::note_not_found(from));
        }

        let result = self.edges.create_edge(from, to).await;
        self.cache.invalidate_note(from).await;

        match result {
            Ok(connection) => {
                tracing::debug!("Connected {} -> {} ({})", from, to, connection.id);
                Ok(connection)
            }
            Err(e) => {
                tracing::warn!("Failed to create connection {} -> {}: {}", from, to, e);
                Err(SyncError::edge_mutation_failed(format!("{} -> {}", from, to), e))
            }
        }
    }

    /// Outgoing connections of a note, read through the cache
    pub async fn connections_from(&self, note_id: &str) -> Result<Vec<Connection>, SyncError> {
        self.cache.note_connections(note_id).await
    }

    /// Every connection for the graph view, read through the cache
    pub async fn all_connections(&self, owner: Option<&str>) -> Result<Vec<Connection>, SyncError> {
        self.cache.all_connections(owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::Note;

    async fn setup() -> (Arc<InMemoryStore>, ConnectionService) {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_note(Note::new_with_id("a", "u1", "A", "")).await;
        store.upsert_note(Note::new_with_id("b", "u1", "B", "")).await;
        let cache = Arc::new(ConnectionCache::new(store.clone()));
        let service = ConnectionService::new(store.clone(), store.clone(), cache);
        (store, service)
    }

    #[tokio::test]
    async fn test_connect_is_visible_through_cache() {
        let (_store, service) = setup().await;
        assert!(service.connections_from("a").await.unwrap().is_empty());
        assert!(service.all_connections(None).await.unwrap().is_empty());

        let conn = service.connect("a", "b").await.unwrap();

        assert_eq!(service.connections_from("a").await.unwrap(), vec![conn.clone()]);
        assert_eq!(service.all_connections(None).await.unwrap(), vec![conn]);
    }

    #[tokio::test]
    async fn test_connect_twice_creates_two_connections() {
        let (store, service) = setup().await;
        service.connect("a", "b").await.unwrap();
        service.connect("a", "b").await.unwrap();

        assert_eq!(store.count_edges("a", "b").await, 2);
        assert_eq!(store.metrics().creates, 2);
    }

    #[tokio::test]
    async fn test_connect_from_unknown_note() {
        let (store, service) = setup().await;
        let err = service.connect("ghost", "b").await.unwrap_err();

        assert!(matches!(err, SyncError::NoteNotFound { .. }));
        assert_eq!(store.metrics().creates, 0);
    }
}
