//! Connection synchronization engine
//!
//! Keeps a note's persisted outgoing connections consistent with the mentions in
//! its live content. Each call to [`ConnectionSyncEngine::reconcile`] is one
//! level-triggered pass:
//!
//! 1. Parse mentions from the content and resolve them to a target id set `T`
//! 2. Skip if `T` equals the set recorded by the previous successful pass
//! 3. Read the note's current connections `E` through the cache
//! 4. Delete every `e ∈ E` with `e.to ∉ T`, one at a time
//! 5. Invalidate the note scope and the global scope
//!
//! The engine only prunes. Connections are created eagerly by the authoring
//! flow (`ConnectionService::connect`) when a mention suggestion is accepted;
//! creating missing edges here would duplicate those.
//!
//! Passes for the same note are mutually exclusive: a pass that starts while
//! another is in flight is rejected, not queued. The next content change
//! re-triggers it. Passes are *not* exclusive with `connect`, so a connection
//! created for a mention newer than the content snapshot being reconciled can be
//! pruned; the previous-pass short-circuit narrows that window.

use crate::config::{ParserConfig, SyncConfig};
use crate::db::{EdgeStore, NoteDirectory, StoreError};
use crate::models::Connection;
use crate::services::connection_cache::ConnectionCache;
use crate::services::error::SyncError;
use crate::services::title_resolver::resolve_targets;
use crate::utils::extract_mentions_with;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Result of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another pass for the same note was in flight; nothing was done
    Rejected,
    /// Resolved mentions match the previous successful pass; nothing was read or written
    Unchanged,
    /// The diff ran; see the report for what was deleted
    Synced(SyncReport),
}

impl SyncOutcome {
    /// Connections deleted by this pass
    pub fn removed(&self) -> usize {
        match self {
            SyncOutcome::Synced(report) => report.removed,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Distinct resolved mention targets
    pub targets: usize,
    /// Connections deleted (or found already gone)
    pub removed: usize,
    /// Deletions the store rejected
    pub failed: usize,
    /// Deletions not attempted because the pass was cancelled
    pub skipped: usize,
}

impl SyncReport {
    fn is_complete(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

pub struct ConnectionSyncEngine {
    edges: Arc<dyn EdgeStore>,
    notes: Arc<dyn NoteDirectory>,
    cache: Arc<ConnectionCache>,
    parser: ParserConfig,

    /// Notes with a pass currently running
    in_flight: Mutex<HashSet<String>>,

    /// Map: note id → target set of the last successful pass
    last_targets: Mutex<HashMap<String, BTreeSet<String>>>,
}

/// Releases a note's in-flight slot when the pass ends, however it ends
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    note_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.note_id);
    }
}

/// Lock a std mutex, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ConnectionSyncEngine {
    /// Create an engine over separate edge and note backends
    pub fn new(
        edges: Arc<dyn EdgeStore>,
        notes: Arc<dyn NoteDirectory>,
        cache: Arc<ConnectionCache>,
        config: &SyncConfig,
    ) -> Result<Self, SyncError> {
        config.validate().map_err(SyncError::invalid_config)?;

        Ok(Self {
            edges,
            notes,
            cache,
            parser: config.parser.clone(),
            in_flight: Mutex::new(HashSet::new()),
            last_targets: Mutex::new(HashMap::new()),
        })
    }

    /// Create an engine and its cache over a single backend implementing both traits
    pub fn from_store<S>(store: Arc<S>, config: &SyncConfig) -> Result<Self, SyncError>
    where
        S: EdgeStore + NoteDirectory + 'static,
    {
        let cache = Arc::new(ConnectionCache::with_ttl(store.clone(), config.cache_ttl()));
        Self::new(store.clone(), store, cache, config)
    }

    /// The cache this engine reads through and invalidates
    pub fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }

    /// Run one reconciliation pass for `note_id` against `content`
    ///
    /// # Examples
    ///
    /// ```
    /// # use notelink_core::db::{EdgeStore, InMemoryStore};
    /// # use notelink_core::{ConnectionSyncEngine, Note, SyncConfig};
    /// # use std::sync::Arc;
    /// # tokio_test::block_on(async {
    /// let store = Arc::new(InMemoryStore::new());
    /// store.upsert_note(Note::new_with_id("a", "u1", "Alpha", "")).await;
    /// store.upsert_note(Note::new_with_id("b", "u1", "Beta", "")).await;
    /// store.create_edge("a", "b").await.unwrap();
    ///
    /// let config = SyncConfig::default();
    /// let engine = ConnectionSyncEngine::from_store(store.clone(), &config).unwrap();
    /// let outcome = engine.reconcile("a", "<p>no mentions left</p>").await.unwrap();
    /// assert_eq!(outcome.removed(), 1);
    /// # });
    /// ```
    pub async fn reconcile(&self, note_id: &str, content: &str) -> Result<SyncOutcome, SyncError> {
        self.reconcile_with_cancel(note_id, content, &CancellationToken::new())
            .await
    }

    /// Run one reconciliation pass, stopping between deletions once `cancel` fires
    pub async fn reconcile_with_cancel(
        &self,
        note_id: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.try_begin(note_id) else {
            tracing::debug!("Reconciliation already running for note {}, dropping pass", note_id);
            return Ok(SyncOutcome::Rejected);
        };

        let note = self
            .notes
            .get_note(note_id)
            .await?
            .ok_or_else(|| SyncError::note_not_found(note_id))?;
        let notes = self.notes.list_notes(&note.owner).await?;

        let tokens = extract_mentions_with(content, &self.parser);
        let targets = resolve_targets(&tokens, &notes);

        if lock(&self.last_targets).get(note_id) == Some(&targets) {
            tracing::debug!("Mentions unchanged for note {}, skipping pass", note_id);
            return Ok(SyncOutcome::Unchanged);
        }

        let current = self.cache.note_connections(note_id).await?;
        let to_remove: Vec<Connection> = current
            .into_iter()
            .filter(|conn| !targets.contains(&conn.to))
            .collect();

        let mut report = SyncReport {
            targets: targets.len(),
            ..SyncReport::default()
        };

        if to_remove.is_empty() {
            self.remember(note_id, targets);
            return Ok(SyncOutcome::Synced(report));
        }

        for (index, conn) in to_remove.iter().enumerate() {
            if cancel.is_cancelled() {
                report.skipped = to_remove.len() - index;
                tracing::debug!(
                    "Reconciliation for note {} cancelled with {} deletion(s) left",
                    note_id,
                    report.skipped
                );
                break;
            }

            match self.edges.delete_edge(&conn.id).await {
                Ok(()) => report.removed += 1,
                Err(StoreError::NotFound { .. }) => {
                    tracing::debug!("Connection {} already gone", conn.id);
                    report.removed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to delete connection {} ({} -> {}): {}",
                        conn.id,
                        conn.from,
                        conn.to,
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        self.cache.invalidate_note(note_id).await;

        if report.is_complete() {
            self.remember(note_id, targets);
        }

        tracing::info!(
            "Reconciled note {}: {} removed, {} failed, {} skipped",
            note_id,
            report.removed,
            report.failed,
            report.skipped
        );

        Ok(SyncOutcome::Synced(report))
    }

    /// Drop everything held for a note once its editor closes
    ///
    /// Clears the previous-pass memory, so the next pass always diffs, and
    /// evicts the note's cached connection list.
    pub async fn forget(&self, note_id: &str) {
        lock(&self.last_targets).remove(note_id);
        self.cache.evict(note_id).await;
    }

    /// Whether a pass is currently running for `note_id`
    pub fn is_in_flight(&self, note_id: &str) -> bool {
        lock(&self.in_flight).contains(note_id)
    }

    fn try_begin(&self, note_id: &str) -> Option<InFlightGuard<'_>> {
        if !lock(&self.in_flight).insert(note_id.to_string()) {
            return None;
        }

        Some(InFlightGuard {
            in_flight: &self.in_flight,
            note_id: note_id.to_string(),
        })
    }

    fn remember(&self, note_id: &str, targets: BTreeSet<String>) {
        lock(&self.last_targets).insert(note_id.to_string(), targets);
    }
}
