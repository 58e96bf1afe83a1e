//! Core domain types and port definitions for thaw.
//!
//! `thaw` restores a file tree from a cold-storage vault whose archives are
//! only reachable through asynchronous, hours-long retrieval jobs. This crate
//! holds the vocabulary shared by every other crate:
//!
//! - [`restore`] - archives, jobs, byte ranges, events and the engine error
//! - [`ports`] - traits implemented by adapters (vault client, catalogue reader,
//!   speed probe, observer)
//! - [`settings`] - tunable budgets and intervals
//! - [`paths`] - per-vault working directory layout
//! - [`utils`] - byte-size parsing, formatting and alignment
//!
//! Adapters live in `thaw-db` and `thaw-vault`; the orchestration engine lives
//! in `thaw-restore`.

#![deny(unused_crate_dependencies)]

pub mod paths;
pub mod ports;
pub mod restore;
pub mod settings;
pub mod utils;

// Re-export commonly used types for convenience
pub use paths::{PathError, VaultPaths, data_root, ensure_private_dir};
pub use ports::{
    CatalogueCursor, CatalogueError, CatalogueReaderPort, CatalogueSourcePort, JobOutput, NoopRestoreObserver,
    RestoreObserver, SpeedProbeError, SpeedProbePort, VaultClientPort, VaultError,
};
pub use restore::{
    ArchiveEntry, ArchiveId, ArchiveRecord, ByteRange, CatalogueFile, JobAction, JobDescriptor,
    JobId, JobPage, JobStatus, PathFilters, RestoreError, RestoreEvent, RestorePhase,
    RestoreResult, RetrievalPolicy, VaultPair, VaultRole, VaultTarget,
};
pub use settings::{RestoreSettings, SettingsError};
pub use utils::byte_size::{GIB, KIB, MIB, align_down, format_bytes, parse_byte_size};

// Silence unused dev-dependency warnings until we add mock-based tests
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
