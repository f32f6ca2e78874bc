//! NoteLink Core
//!
//! Keeps the mention-derived connection graph between notes consistent with
//! what each note's content actually mentions.
//!
//! # Architecture
//!
//! - **Parse**: mention elements are pulled out of serialized editor content
//! - **Resolve**: mentions map to note ids by stable id, else by title
//! - **Reconcile**: connections whose target is no longer mentioned are pruned
//! - **Invalidate**: shared caches are marked stale so views re-read
//!
//! Connections are *created* only by the authoring flow when a mention
//! suggestion is accepted; the sync engine never creates them.
//!
//! # Modules
//!
//! - [`models`] - Note, Connection and MentionToken
//! - [`utils`] - mention parser
//! - [`db`] - store traits and the in-memory store
//! - [`services`] - sync engine, sessions, caches and connection service
//! - [`config`] - parser and cache configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::SyncConfig;
pub use models::*;
pub use services::*;
