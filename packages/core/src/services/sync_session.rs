//! Per-note reconciliation session
//!
//! A `NoteSyncSession` lives as long as a note is open in the editor. It owns a
//! single worker task fed by a trigger queue of depth 1:
//!
//! - Every content change stores the latest snapshot and enqueues a trigger.
//!   If a trigger is already waiting the new one is dropped; the waiting trigger
//!   will reconcile the newest snapshot anyway.
//! - Observed changes to the note's connection list re-trigger with the last
//!   seen content.
//! - Closing (or dropping) the session cancels its token. The worker exits and
//!   a pass in progress stops before its next deletion.

use crate::db::DomainEvent;
use crate::services::connection_sync::{ConnectionSyncEngine, SyncOutcome};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Content,
    Edges,
}

pub struct NoteSyncSession {
    note_id: String,
    engine: Arc<ConnectionSyncEngine>,
    trigger_tx: mpsc::Sender<Trigger>,
    latest_content: Arc<Mutex<Option<String>>>,
    passes_rx: watch::Receiver<u64>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl NoteSyncSession {
    /// Start a session for `note_id`. Must be called within a tokio runtime.
    pub fn spawn(engine: Arc<ConnectionSyncEngine>, note_id: impl Into<String>) -> Self {
        let note_id = note_id.into();
        let (trigger_tx, trigger_rx) = mpsc::channel::<Trigger>(1);
        let (passes_tx, passes_rx) = watch::channel(0u64);
        let latest_content = Arc::new(Mutex::new(None));
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(run_worker(
            engine.clone(),
            note_id.clone(),
            trigger_rx,
            latest_content.clone(),
            passes_tx,
            cancel.clone(),
        ));

        tracing::debug!("Sync session opened for note {}", note_id);

        Self {
            note_id,
            engine,
            trigger_tx,
            latest_content,
            passes_rx,
            cancel,
            worker: Some(worker),
        }
    }

    /// Record new content and request a pass
    ///
    /// Returns `false` if the trigger was dropped because one is already queued
    /// or the session is closed.
    pub fn content_changed(&self, content: impl Into<String>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        *self
            .latest_content
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(content.into());
        self.enqueue(Trigger::Content)
    }

    /// Request a pass against the last seen content after the connection list changed
    pub fn edges_changed(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.enqueue(Trigger::Edges)
    }

    /// Re-trigger on every store event that touches this note's outgoing connections
    ///
    /// The forwarding task stops when the session closes or the channel closes.
    pub fn watch_events(&self, mut events: broadcast::Receiver<DomainEvent>) {
        let note_id = self.note_id.clone();
        let trigger_tx = self.trigger_tx.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => break,

                    received = events.recv() => match received {
                        Ok(event) if event.edge_source() == Some(note_id.as_str()) => {
                            let _ = trigger_tx.try_send(Trigger::Edges);
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(
                                "Event queue lagged by {} for note {}",
                                skipped,
                                note_id
                            );
                            let _ = trigger_tx.try_send(Trigger::Edges);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
    }

    /// Watch the number of passes the worker has finished
    pub fn completed_passes(&self) -> watch::Receiver<u64> {
        self.passes_rx.clone()
    }

    /// Cancel the session and wait for its worker to exit
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::warn!("Sync worker for note {} ended abnormally: {}", self.note_id, e);
            }
        }
        self.engine.forget(&self.note_id).await;
    }

    fn enqueue(&self, trigger: Trigger) -> bool {
        match self.trigger_tx.try_send(trigger) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(
                    "Pass already queued for note {}, dropping {:?} trigger",
                    self.note_id,
                    trigger
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(
                    "Sync worker for note {} has shut down, trigger ignored",
                    self.note_id
                );
                false
            }
        }
    }
}

impl Drop for NoteSyncSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(
    engine: Arc<ConnectionSyncEngine>,
    note_id: String,
    mut trigger_rx: mpsc::Receiver<Trigger>,
    latest_content: Arc<Mutex<Option<String>>>,
    passes_tx: watch::Sender<u64>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            trigger = trigger_rx.recv() => {
                let Some(trigger) = trigger else { break };

                let content = latest_content
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .clone();
                let Some(content) = content else {
                    tracing::debug!(
                        "No content seen yet for note {}, ignoring {:?} trigger",
                        note_id,
                        trigger
                    );
                    continue;
                };

                match engine.reconcile_with_cancel(&note_id, &content, &cancel).await {
                    Ok(SyncOutcome::Synced(report)) => {
                        tracing::debug!("Pass for note {} finished: {:?}", note_id, report);
                    }
                    Ok(outcome) => {
                        tracing::debug!("Pass for note {} finished: {:?}", note_id, outcome);
                    }
                    Err(e) => {
                        tracing::warn!("Reconciliation failed for note {}: {}", note_id, e);
                    }
                }

                passes_tx.send_modify(|n| *n += 1);
            }
        }
    }

    engine.forget(&note_id).await;
    tracing::debug!("Sync session closed for note {}", note_id);
}
