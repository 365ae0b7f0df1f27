//! Error types for the document store

use thiserror::Error;

/// Errors returned by [`DocumentStore`](super::store::DocumentStore) and
/// [`DraftManager`](super::drafts::DraftManager) operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// An operation ran before `init` completed
    #[error("document store is not ready")]
    NotReady,

    /// The underlying engine failed
    #[error("failed to {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageCause,
    },
}

/// The original cause carried by [`StoreError::Storage`]
#[derive(Debug, Error)]
pub enum StorageCause {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Encoding(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("timestamp {0} is outside the storable range")]
    TimestampOutOfRange(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, StoreError::NotReady)
    }
}
