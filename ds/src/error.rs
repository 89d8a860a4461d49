//! Store error types

use thiserror::Error;

/// Errors from document store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    Runtime(String),
}
