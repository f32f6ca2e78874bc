//! Persistence Layer
//!
//! - `EdgeStore` / `NoteDirectory` traits: the backend seams the sync engine uses
//! - `InMemoryStore`: reference implementation emitting `DomainEvent`s
//!
//! Production deployments plug a remote API client in behind the same traits.

mod error;
pub mod events;
pub mod memory_store;
pub mod store;

pub use error::StoreError;
pub use events::DomainEvent;
pub use memory_store::{InMemoryStore, MetricsSnapshot};
pub use store::{EdgeStore, NoteDirectory, StoreResult};
