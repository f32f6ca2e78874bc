//! Connection read caches
//!
//! Two named read-through scopes sit in front of the `EdgeStore`:
//!
//! - `("noteConnections", noteId)` - one note's outgoing connections
//! - `("note-connections")` - every connection, for the graph view
//!
//! # Cache Invalidation
//!
//! - **Event-driven**: `invalidate(scope)` marks a scope stale; the next read
//!   re-fetches. Each invalidation is also broadcast so views can re-read.
//! - **Time-based** (optional): entries older than the configured TTL are stale.
//!
//! A fetch that overlaps an invalidation is returned to its caller but stored
//! as already stale, so the next reader still sees fresh data.
//!
//! One `ConnectionCache` is built per session and shared via `Arc`.

use crate::db::EdgeStore;
use crate::models::Connection;
use crate::services::error::SyncError;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};

/// Key prefix of the per-note scope
pub const NOTE_CONNECTIONS_KEY: &str = "noteConnections";
/// Key of the global scope
pub const ALL_CONNECTIONS_KEY: &str = "note-connections";

const INVALIDATION_CHANNEL_CAPACITY: usize = 128;

/// A named, invalidatable cache scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheScope {
    /// Outgoing connections of one note
    NoteConnections(String),
    /// All connections (graph visualization)
    AllConnections,
}

impl CacheScope {
    pub fn note(note_id: impl Into<String>) -> Self {
        Self::NoteConnections(note_id.into())
    }

    /// Key parts as consumers address the scope
    pub fn key(&self) -> (&'static str, Option<&str>) {
        match self {
            CacheScope::NoteConnections(id) => (NOTE_CONNECTIONS_KEY, Some(id.as_str())),
            CacheScope::AllConnections => (ALL_CONNECTIONS_KEY, None),
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            (name, Some(id)) => write!(f, "{}:{}", name, id),
            (name, None) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    connections: Vec<Connection>,
    fetched_at: Instant,
    stale: bool,
}

impl CachedEntry {
    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        !self.stale && ttl.map_or(true, |ttl| self.fetched_at.elapsed() <= ttl)
    }
}

/// Read-through cache for connection lists
pub struct ConnectionCache {
    store: Arc<dyn EdgeStore>,

    /// Map: note id → outgoing connections
    per_note: RwLock<HashMap<String, CachedEntry>>,

    /// Map: owner filter → all connections (None = every owner)
    global: RwLock<HashMap<Option<String>, CachedEntry>>,

    ttl: Option<Duration>,

    /// Bumped on every invalidation; fetches that straddle a bump are stored stale
    epoch: AtomicU64,

    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,

    invalidation_tx: broadcast::Sender<CacheScope>,
}

impl ConnectionCache {
    /// Create a cache whose entries only go stale through invalidation
    pub fn new(store: Arc<dyn EdgeStore>) -> Self {
        Self::with_ttl(store, None)
    }

    /// Create a cache with optional time-based staleness
    pub fn with_ttl(store: Arc<dyn EdgeStore>, ttl: Option<Duration>) -> Self {
        let (invalidation_tx, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);
        Self {
            store,
            per_note: RwLock::new(HashMap::new()),
            global: RwLock::new(HashMap::new()),
            ttl,
            epoch: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            invalidation_tx,
        }
    }

    /// Outgoing connections of `note_id`, fetched from the store on miss
    pub async fn note_connections(&self, note_id: &str) -> Result<Vec<Connection>, SyncError> {
        {
            let cache = self.per_note.read().await;
            if let Some(entry) = cache.get(note_id).filter(|e| e.is_fresh(self.ttl)) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.connections.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let epoch = self.epoch.load(Ordering::Acquire);
        let connections = self.store.list_edges_from(note_id).await?;

        let entry = self.entry(connections.clone(), epoch);
        self.per_note.write().await.insert(note_id.to_string(), entry);
        Ok(connections)
    }

    /// All connections (optionally for one owner), fetched from the store on miss
    pub async fn all_connections(&self, owner: Option<&str>) -> Result<Vec<Connection>, SyncError> {
        let key = owner.map(str::to_string);
        {
            let cache = self.global.read().await;
            if let Some(entry) = cache.get(&key).filter(|e| e.is_fresh(self.ttl)) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.connections.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let epoch = self.epoch.load(Ordering::Acquire);
        let connections = self.store.list_all_edges(owner).await?;

        let entry = self.entry(connections.clone(), epoch);
        self.global.write().await.insert(key, entry);
        Ok(connections)
    }

    /// Mark a scope stale so its next read re-fetches
    pub async fn invalidate(&self, scope: CacheScope) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.invalidations.fetch_add(1, Ordering::Relaxed);

        match &scope {
            CacheScope::NoteConnections(note_id) => {
                if let Some(entry) = self.per_note.write().await.get_mut(note_id) {
                    entry.stale = true;
                }
            }
            CacheScope::AllConnections => {
                for entry in self.global.write().await.values_mut() {
                    entry.stale = true;
                }
            }
        }

        tracing::debug!("Invalidated cache scope {}", scope);
        // No subscribers is fine
        let _ = self.invalidation_tx.send(scope);
    }

    /// Invalidate the note's scope and the global scope
    pub async fn invalidate_note(&self, note_id: &str) {
        self.invalidate(CacheScope::note(note_id)).await;
        self.invalidate(CacheScope::AllConnections).await;
    }

    /// Drop a note's cached connection list entirely
    ///
    /// Unlike `invalidate`, nothing is broadcast: the entry is released because
    /// no one is viewing the note, not because its connections changed.
    pub async fn evict(&self, note_id: &str) {
        if self.per_note.write().await.remove(note_id).is_some() {
            tracing::debug!("Evicted cached connections for note {}", note_id);
        }
    }

    /// Receive every scope invalidated from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CacheScope> {
        self.invalidation_tx.subscribe()
    }

    /// Get cache statistics (for debugging/monitoring)
    pub async fn stats(&self) -> CacheStats {
        let per_note = self.per_note.read().await;
        let global = self.global.read().await;

        CacheStats {
            note_entries: per_note.len(),
            global_entries: global.len(),
            stale_entries: per_note
                .values()
                .chain(global.values())
                .filter(|e| !e.is_fresh(self.ttl))
                .count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn entry(&self, connections: Vec<Connection>, epoch: u64) -> CachedEntry {
        CachedEntry {
            connections,
            fetched_at: Instant::now(),
            stale: self.epoch.load(Ordering::Acquire) != epoch,
        }
    }
}

/// Statistics about the connection cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub note_entries: usize,
    pub global_entries: usize,
    pub stale_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}
