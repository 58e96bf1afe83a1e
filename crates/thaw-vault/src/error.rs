//! Internal error types for the directory vault.
//!
//! These errors are internal to `thaw-vault` and are mapped to core port errors
//! at the boundary.

use thaw_core::VaultError;
use thiserror::Error;

/// Result type alias for directory vault operations.
pub(crate) type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("Vault '{0}' does not exist")]
    VaultMissing(String),

    #[error("Archive '{0}' not found")]
    ArchiveMissing(String),

    #[error("The job ID was not found: {0}")]
    JobMissing(String),

    #[error("Too many jobs in progress ({in_progress}), retry later")]
    TooManyJobs { in_progress: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt job record: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ArchiveMissing(id) => Self::archive_not_found(id),
            StoreError::JobMissing(id) => Self::job_not_found(id),
            e @ StoreError::TooManyJobs { .. } => Self::rate_limited(e.to_string()),
            e @ (StoreError::VaultMissing(_) | StoreError::InvalidRequest(_) | StoreError::Json(_)) => {
                Self::remote(e.to_string())
            }
            StoreError::Io(e) => Self::Transport(e.to_string()),
        }
    }
}
