// keygate — Store error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Item already exists: {0}")]
    Duplicate(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupted row: {0}")]
    Corrupted(String),

    #[error("Database not initialized — run `keygate init` first")]
    NotInitialized,
}
