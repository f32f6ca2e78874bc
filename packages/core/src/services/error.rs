//! Service Layer Error Types

use crate::db::StoreError;
use thiserror::Error;

/// Errors surfaced by the sync engine and connection service
///
/// None of these are fatal: callers log them and rely on the next content
/// change to retry.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The note being reconciled or connected does not exist
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// A store read failed
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    /// Creating or deleting a connection failed
    #[error("Connection mutation failed for {edge}: {source}")]
    EdgeMutationFailed {
        edge: String,
        #[source]
        source: StoreError,
    },

    /// Configuration rejected by `SyncConfig::validate`
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    pub fn note_not_found(id: impl Into<String>) -> Self {
        Self::NoteNotFound { id: id.into() }
    }

    pub fn edge_mutation_failed(edge: impl Into<String>, source: StoreError) -> Self {
        Self::EdgeMutationFailed {
            edge: edge.into(),
            source,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
