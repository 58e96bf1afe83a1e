//! Restore domain: identifiers, catalogue records, jobs, events and errors.

mod errors;
mod events;
mod types;

pub use errors::{RestoreError, RestoreResult};
pub use events::{RestoreEvent, RestorePhase};
pub use types::{
    ArchiveEntry, ArchiveId, ArchiveRecord, ByteRange, CATALOGUE_VAULT_SUFFIX, CatalogueFile,
    JobAction, JobDescriptor, JobId, JobPage, JobStatus, PathFilters, RetrievalPolicy, VaultPair,
    VaultRole, VaultTarget,
};
