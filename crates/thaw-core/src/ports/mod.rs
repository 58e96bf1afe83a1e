//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the restore engine expects from
//! infrastructure. They contain no implementation details and use only domain
//! types.
//!
//! # Design Rules
//!
//! - No `sqlx` or HTTP types in any signature
//! - Adapters map their internal errors to the port errors defined here
//! - Every trait is `Send + Sync` so it can be shared behind `Arc`

pub mod catalogue;
pub mod restore_observer;
pub mod speed_probe;
pub mod vault_client;

use thiserror::Error;

pub use catalogue::{CatalogueCursor, CatalogueReaderPort, CatalogueSourcePort};
pub use restore_observer::{NoopRestoreObserver, RestoreObserver};
pub use speed_probe::{SpeedProbeError, SpeedProbePort};
pub use vault_client::{JobOutput, VaultClientPort};

/// Errors reported by a vault client.
///
/// The engine recovers from `RateLimited` and `ArchiveNotFound`; `JobNotFound`
/// is recovered where a cached job id may have expired. Everything else is fatal.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The vault refused the request because of its retrieval policy or request rate.
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// The archive no longer exists in the vault.
    #[error("Archive not found: {archive_id}")]
    ArchiveNotFound { archive_id: String },

    /// The job id is unknown to the vault (never existed or expired).
    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    /// Any other error reported by the vault.
    #[error("{message}")]
    Remote { message: String },

    /// The request could not be delivered.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl VaultError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    pub fn archive_not_found(archive_id: impl Into<String>) -> Self {
        Self::ArchiveNotFound {
            archive_id: archive_id.into(),
        }
    }

    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        Self::JobNotFound {
            job_id: job_id.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Whether the same request may succeed later without any change.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transport(_))
    }
}

/// Errors reported by a catalogue reader.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// No local catalogue exists yet.
    #[error("Catalogue not found at {0}")]
    Missing(String),

    /// Storage-level failure.
    #[error("Storage error: {0}")]
    Storage(String),
}
