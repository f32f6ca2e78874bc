//! Persistence traits consumed by the sync engine
//!
//! `EdgeStore` and `NoteDirectory` are the seams to whatever backend holds
//! connections and notes. The engine and caches only ever talk to these traits,
//! so a remote API client and the in-memory store are interchangeable.
//!
//! All methods are async; implementations must be `Send + Sync` so they can be
//! shared behind `Arc<dyn ...>` across tasks.

use super::StoreError;
use crate::models::{Connection, Note};
use async_trait::async_trait;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for directed note connections
#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Create a connection `from -> to`
    ///
    /// The owner is taken from the `from` note. Duplicate `(from, to)` pairs are
    /// allowed.
    async fn create_edge(&self, from: &str, to: &str) -> StoreResult<Connection>;

    /// Delete a connection by id
    async fn delete_edge(&self, id: &str) -> StoreResult<()>;

    /// All connections whose `from` is `note_id`
    async fn list_edges_from(&self, note_id: &str) -> StoreResult<Vec<Connection>>;

    /// All connections, optionally restricted to one owner
    async fn list_all_edges(&self, owner: Option<&str>) -> StoreResult<Vec<Connection>>;
}

/// Read access to the note collection
#[async_trait]
pub trait NoteDirectory: Send + Sync {
    /// All notes owned by `owner`, in directory order
    async fn list_notes(&self, owner: &str) -> StoreResult<Vec<Note>>;

    /// A single note by id
    async fn get_note(&self, id: &str) -> StoreResult<Option<Note>>;
}
