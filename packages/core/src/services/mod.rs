//! Business Services
//!
//! - `ConnectionSyncEngine` - prunes connections whose mentions left the content
//! - `NoteSyncSession` - per-note worker driving the engine from editor changes
//! - `ConnectionService` - creates connections when mention suggestions are accepted
//! - `ConnectionCache` - shared read-through cache for connection lists
//! - `title_resolver` - maps mention tokens to note ids

pub mod connection_cache;
pub mod connection_service;
pub mod connection_sync;
pub mod error;
pub mod sync_session;
pub mod title_resolver;

pub use connection_cache::{CacheScope, CacheStats, ConnectionCache};
pub use connection_service::ConnectionService;
pub use connection_sync::{ConnectionSyncEngine, SyncOutcome, SyncReport};
pub use error::SyncError;
pub use sync_session::NoteSyncSession;
