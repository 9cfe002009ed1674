//! Store error types.

use thiserror::Error;

use crate::codec::CodecError;

/// Errors raised by local and remote stores.
///
/// Services pass these through unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned status {status} for {resource}")]
    Status { status: u16, resource: String },

    #[error("Revision conflict on {resource}: expected {expected}, found {found}")]
    Conflict {
        resource: String,
        expected: u64,
        found: u64,
    },

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    /// A write the backend skipped (offline) where the caller needs it stored.
    #[error("Write to {0} was skipped while offline")]
    Skipped(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Turns the `false` of a skipped write into [`StoreError::Skipped`].
    pub fn require(stored: bool, resource: &str) -> Result<(), StoreError> {
        if stored {
            Ok(())
        } else {
            Err(StoreError::Skipped(resource.to_string()))
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
