//! Integration tests for NoteSyncSession
//!
//! Tests cover:
//! - Content changes driving reconciliation through the worker
//! - Depth-1 trigger queue dropping excess triggers
//! - Re-triggering from store events
//! - Cancellation on close

use anyhow::Result;
use notelink_core::{
    db::{EdgeStore, InMemoryStore},
    models::Note,
    services::{ConnectionService, ConnectionSyncEngine, NoteSyncSession},
    SyncConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn mention(label: &str) -> String {
    format!(r#"<span data-type="mention">@{}</span>"#, label)
}

async fn create_test_env() -> Result<(Arc<InMemoryStore>, Arc<ConnectionSyncEngine>)> {
    let store = Arc::new(InMemoryStore::new());
    store.upsert_note(Note::new_with_id("A", "u1", "Alpha", "")).await;
    store.upsert_note(Note::new_with_id("B", "u1", "Beta", "")).await;
    store.upsert_note(Note::new_with_id("C", "u1", "Gamma", "")).await;

    let engine = Arc::new(ConnectionSyncEngine::from_store(
        store.clone(),
        &SyncConfig::default(),
    )?);
    Ok((store, engine))
}

async fn wait_for_passes(rx: &mut watch::Receiver<u64>, count: u64) -> Result<()> {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|n| *n >= count)).await??;
    Ok(())
}

#[tokio::test]
async fn test_content_change_prunes_through_worker() -> Result<()> {
    let (store, engine) = create_test_env().await?;
    store.create_edge("A", "B").await?;
    store.create_edge("A", "C").await?;

    let session = NoteSyncSession::spawn(engine.clone(), "A");
    let mut passes = session.completed_passes();

    assert!(session.content_changed(mention("Gamma")));
    wait_for_passes(&mut passes, 1).await?;

    assert_eq!(store.count_edges("A", "B").await, 0);
    assert_eq!(store.count_edges("A", "C").await, 1);

    session.close().await;
    Ok(())
}

#[tokio::test]
async fn test_edges_changed_before_content_is_ignored() -> Result<()> {
    let (store, engine) = create_test_env().await?;
    store.create_edge("A", "B").await?;

    let session = NoteSyncSession::spawn(engine, "A");
    let mut passes = session.completed_passes();

    assert!(session.edges_changed());
    // Give the worker a chance to run
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*passes.borrow_and_update(), 0);
    assert_eq!(store.metrics().deletes, 0);

    session.close().await;
    Ok(())
}

#[tokio::test]
async fn test_burst_of_changes_reconciles_latest_content() -> Result<()> {
    let (store, engine) = create_test_env().await?;
    store.create_edge("A", "B").await?;
    store.create_edge("A", "C").await?;

    let session = NoteSyncSession::spawn(engine, "A");
    let mut passes = session.completed_passes();

    // No await between sends: the queue holds one trigger, the rest are dropped
    let accepted = [
        session.content_changed(mention("Beta")),
        session.content_changed(format!("{}{}", mention("Beta"), mention("Gamma"))),
        session.content_changed(mention("Gamma")),
    ];
    assert!(accepted[0]);
    assert!(!accepted[1]);
    assert!(!accepted[2]);

    wait_for_passes(&mut passes, 1).await?;

    // The queued trigger saw the newest snapshot
    assert_eq!(store.count_edges("A", "B").await, 0);
    assert_eq!(store.count_edges("A", "C").await, 1);
    assert_eq!(store.metrics().deletes, 1);

    session.close().await;
    Ok(())
}

#[tokio::test]
async fn test_store_events_retrigger_pass() -> Result<()> {
    let (store, engine) = create_test_env().await?;
    let service = ConnectionService::new(store.clone(), store.clone(), engine.cache().clone());

    let session = NoteSyncSession::spawn(engine.clone(), "A");
    session.watch_events(store.subscribe_to_events());
    let mut passes = session.completed_passes();

    assert!(session.content_changed("<p>nothing mentioned</p>"));
    wait_for_passes(&mut passes, 1).await?;

    // A connection appears for a mention the content does not hold. The edge
    // event re-triggers, but mentions are unchanged so the pass is skipped.
    service.connect("A", "B").await?;
    wait_for_passes(&mut passes, 2).await?;
    assert_eq!(store.count_edges("A", "B").await, 1);

    // After the content changes the stale connection is pruned
    assert!(session.content_changed(format!("<p>{}</p>", mention("Gamma"))));
    tokio::time::timeout(Duration::from_secs(2), async {
        while store.count_edges("A", "B").await != 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;

    session.close().await;
    Ok(())
}

#[tokio::test]
async fn test_closed_session_rejects_triggers_and_forgets_note() -> Result<()> {
    let (store, engine) = create_test_env().await?;

    let session = NoteSyncSession::spawn(engine.clone(), "A");
    let mut passes = session.completed_passes();
    assert!(session.content_changed(""));
    wait_for_passes(&mut passes, 1).await?;
    session.close().await;

    // Cached connections for A were released with the session
    assert_eq!(engine.cache().stats().await.note_entries, 0);

    // The engine no longer short-circuits for A
    store.create_edge("A", "B").await?;
    assert_eq!(engine.reconcile("A", "").await?.removed(), 1);
    Ok(())
}

#[tokio::test]
async fn test_dropping_session_stops_worker() -> Result<()> {
    let (_store, engine) = create_test_env().await?;

    let session = NoteSyncSession::spawn(engine, "A");
    let mut passes = session.completed_passes();
    drop(session);

    // Worker exits and drops its sender
    tokio::time::timeout(Duration::from_secs(2), async {
        while passes.changed().await.is_ok() {}
    })
    .await?;
    Ok(())
}
