//! Store Error Types
//!
//! Errors raised by edge and note persistence backends. Service-layer code
//! wraps these in `SyncError`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Requested record does not exist
    #[error("Record not found: {id}")]
    NotFound { id: String },

    /// Backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
