//! Restore error types.
//!
//! `RestoreError` is the engine-level error. Rate limiting and missing
//! archives are handled inside the engine; every variant that reaches the
//! caller of `restore` aborts the run.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::paths::PathError;
use crate::ports::{CatalogueError, VaultError};
use crate::restore::JobId;
use crate::settings::SettingsError;

/// Result alias used across the engine.
pub type RestoreResult<T> = Result<T, RestoreError>;

/// Error type for restore operations.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// The vault client reported an error the engine does not recover from.
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// The catalogue could not be read.
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    /// A local filesystem operation failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A remote job finished without producing output.
    #[error("Job {job_id} failed on the vault")]
    JobFailed {
        /// The failed job.
        job_id: JobId,
    },

    /// A job output stream ended before the requested range was delivered.
    #[error("Job {job_id} delivered {received} of {expected} requested bytes")]
    TruncatedOutput {
        /// The job being downloaded.
        job_id: JobId,
        /// Bytes requested.
        expected: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// A working or destination directory could not be prepared.
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// The destination exists and is not a directory.
    #[error("Destination {0} exists and is not a directory")]
    DestinationIsFile(PathBuf),

    /// The run cache could not be read or written.
    #[error("Run cache error: {0}")]
    Cache(String),

    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// The run was interrupted.
    #[error("Restore cancelled")]
    Cancelled,
}

impl RestoreError {
    /// Create an I/O error bound to the path it concerns.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a run cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Check if rerunning the same restore is expected to make progress.
    ///
    /// Every completed step is persisted, so recoverable errors only need a rerun.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Vault(e) => e.is_transient(),
            Self::Cancelled | Self::TruncatedOutput { .. } => true,
            Self::Catalogue(_)
            | Self::Io { .. }
            | Self::Path(_)
            | Self::JobFailed { .. }
            | Self::DestinationIsFile(_)
            | Self::Cache(_)
            | Self::InvalidSettings(_) => false,
        }
    }

    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Vault(e) => format!("The vault rejected a request: {e}"),
            Self::Catalogue(e) => format!("The catalogue could not be read: {e}"),
            Self::Io { path, source } => {
                format!("Could not access {}: {source}", path.display())
            }
            Self::Path(e) => e.to_string(),
            Self::JobFailed { job_id } => {
                format!("Vault job {job_id} failed. Rerun the restore to submit it again.")
            }
            Self::TruncatedOutput { .. } => {
                "A download ended early. Rerun the restore to resume where it stopped.".to_string()
            }
            Self::DestinationIsFile(path) => {
                format!("{} is a file. Choose a directory as destination.", path.display())
            }
            Self::Cache(msg) => format!("The run cache is unusable: {msg}"),
            Self::InvalidSettings(e) => format!("Invalid settings: {e}"),
            Self::Cancelled => {
                "Restore interrupted. Rerun the same command to resume.".to_string()
            }
        }
    }
}
