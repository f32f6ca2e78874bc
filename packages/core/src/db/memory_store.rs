//! In-memory note and connection store
//!
//! Reference implementation of `EdgeStore` + `NoteDirectory` used by the
//! embedding application in offline mode and by tests. Notes keep insertion
//! order so title resolution sees them in a stable order.
//!
//! Every mutation emits a `DomainEvent` on a broadcast channel, and every trait
//! call is counted in `StoreMetrics`.

use super::events::DomainEvent;
use super::store::{EdgeStore, NoteDirectory, StoreResult};
use super::StoreError;
use crate::models::{Connection, Note};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, RwLock};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct StoreState {
    notes: Vec<Note>,
    edges: Vec<Connection>,
}

/// Call counts for the store's trait operations
#[derive(Debug, Default)]
pub struct StoreMetrics {
    creates: AtomicUsize,
    deletes: AtomicUsize,
    edge_lists: AtomicUsize,
    note_lists: AtomicUsize,
}

/// Point-in-time copy of `StoreMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub creates: usize,
    pub deletes: usize,
    pub edge_lists: usize,
    pub note_lists: usize,
}

impl MetricsSnapshot {
    /// Create + delete calls
    pub fn mutations(&self) -> usize {
        self.creates + self.deletes
    }
}

impl StoreMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            creates: self.creates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            edge_lists: self.edge_lists.load(Ordering::Relaxed),
            note_lists: self.note_lists.load(Ordering::Relaxed),
        }
    }
}

pub struct InMemoryStore {
    state: RwLock<StoreState>,
    metrics: StoreMetrics,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            metrics: StoreMetrics::default(),
            event_tx,
        }
    }

    /// Subscribe to domain events emitted by this store
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Insert a note, or replace the note with the same id in place
    pub async fn upsert_note(&self, note: Note) {
        {
            let mut state = self.state.write().await;
            match state.notes.iter_mut().find(|n| n.id == note.id) {
                Some(existing) => *existing = note.clone(),
                None => state.notes.push(note.clone()),
            }
        }
        self.emit(DomainEvent::NoteUpserted(note));
    }

    /// Remove a note. Connections pointing at it are left for reconciliation to prune.
    pub async fn delete_note(&self, id: &str) -> StoreResult<()> {
        {
            let mut state = self.state.write().await;
            let before = state.notes.len();
            state.notes.retain(|n| n.id != id);
            if state.notes.len() == before {
                return Err(StoreError::not_found(id));
            }
        }
        self.emit(DomainEvent::NoteDeleted { id: id.to_string() });
        Ok(())
    }

    /// Number of stored connections `from -> to`
    pub async fn count_edges(&self, from: &str, to: &str) -> usize {
        let state = self.state.read().await;
        state
            .edges
            .iter()
            .filter(|e| e.from == from && e.to == to)
            .count()
    }

    fn emit(&self, event: DomainEvent) {
        // No receivers is the normal idle state
        let _ = self.event_tx.send(event);
    }
}

#[async_trait]
impl EdgeStore for InMemoryStore {
    async fn create_edge(&self, from: &str, to: &str) -> StoreResult<Connection> {
        self.metrics.creates.fetch_add(1, Ordering::Relaxed);

        let connection = {
            let mut state = self.state.write().await;
            let owner = state
                .notes
                .iter()
                .find(|n| n.id == from)
                .map(|n| n.owner.clone())
                .ok_or_else(|| StoreError::not_found(from))?;

            let connection = Connection::new(owner, from, to);
            state.edges.push(connection.clone());
            connection
        };

        self.emit(DomainEvent::EdgeCreated(connection.clone()));
        Ok(connection)
    }

    async fn delete_edge(&self, id: &str) -> StoreResult<()> {
        self.metrics.deletes.fetch_add(1, Ordering::Relaxed);

        let removed = {
            let mut state = self.state.write().await;
            let position = state
                .edges
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(|| StoreError::not_found(id))?;
            state.edges.remove(position)
        };

        self.emit(DomainEvent::EdgeDeleted {
            id: removed.id,
            from: removed.from,
        });
        Ok(())
    }

    async fn list_edges_from(&self, note_id: &str) -> StoreResult<Vec<Connection>> {
        self.metrics.edge_lists.fetch_add(1, Ordering::Relaxed);

        let state = self.state.read().await;
        Ok(state
            .edges
            .iter()
            .filter(|e| e.from == note_id)
            .cloned()
            .collect())
    }

    async fn list_all_edges(&self, owner: Option<&str>) -> StoreResult<Vec<Connection>> {
        self.metrics.edge_lists.fetch_add(1, Ordering::Relaxed);

        let state = self.state.read().await;
        Ok(state
            .edges
            .iter()
            .filter(|e| owner.map_or(true, |o| e.owner == o))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NoteDirectory for InMemoryStore {
    async fn list_notes(&self, owner: &str) -> StoreResult<Vec<Note>> {
        self.metrics.note_lists.fetch_add(1, Ordering::Relaxed);

        let state = self.state.read().await;
        Ok(state
            .notes
            .iter()
            .filter(|n| n.owner == owner)
            .cloned()
            .collect())
    }

    async fn get_note(&self, id: &str) -> StoreResult<Option<Note>> {
        let state = self.state.read().await;
        Ok(state.notes.iter().find(|n| n.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_notes() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.upsert_note(Note::new_with_id("a", "u1", "A", "")).await;
        store.upsert_note(Note::new_with_id("b", "u1", "B", "")).await;
        store.upsert_note(Note::new_with_id("x", "u2", "X", "")).await;
        store
    }

    #[tokio::test]
    async fn test_create_edge_takes_owner_from_source_note() {
        let store = store_with_notes().await;
        let conn = store.create_edge("a", "b").await.unwrap();

        assert_eq!(conn.owner, "u1");
        assert_eq!(store.list_edges_from("a").await.unwrap(), vec![conn]);
        assert_eq!(store.metrics().creates, 1);
    }

    #[tokio::test]
    async fn test_create_edge_from_unknown_note_fails() {
        let store = store_with_notes().await;
        let err = store.create_edge("missing", "b").await.unwrap_err();
        assert_eq!(err, StoreError::not_found("missing"));
    }

    #[tokio::test]
    async fn test_duplicate_edges_allowed() {
        let store = store_with_notes().await;
        store.create_edge("a", "b").await.unwrap();
        store.create_edge("a", "b").await.unwrap();
        assert_eq!(store.count_edges("a", "b").await, 2);
    }

    #[tokio::test]
    async fn test_list_all_edges_filters_by_owner() {
        let store = store_with_notes().await;
        store.create_edge("a", "b").await.unwrap();
        store.create_edge("x", "a").await.unwrap();

        assert_eq!(store.list_all_edges(None).await.unwrap().len(), 2);
        let u2 = store.list_all_edges(Some("u2")).await.unwrap();
        assert_eq!(u2.len(), 1);
        assert_eq!(u2[0].from, "x");
    }

    #[tokio::test]
    async fn test_delete_edge_emits_event() {
        let store = store_with_notes().await;
        let conn = store.create_edge("a", "b").await.unwrap();
        let mut rx = store.subscribe_to_events();

        store.delete_edge(&conn.id).await.unwrap();

        match rx.recv().await.unwrap() {
            DomainEvent::EdgeDeleted { id, from } => {
                assert_eq!(id, conn.id);
                assert_eq!(from, "a");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(store.delete_edge(&conn.id).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = store_with_notes().await;
        store
            .upsert_note(Note::new_with_id("a", "u1", "Renamed", ""))
            .await;

        let notes = store.list_notes("u1").await.unwrap();
        assert_eq!(notes[0].id, "a");
        assert_eq!(notes[0].title, "Renamed");
        assert_eq!(notes.len(), 2);
    }
}
