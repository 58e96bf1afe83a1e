//! Remote retrieval client port.
//!
//! The vault is a cold store: archives can only be read by submitting a
//! retrieval job, waiting (hours) for the vault to stage it, then fetching the
//! job output. Implementations must be `Send + Sync` for use behind `Arc`.

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::VaultError;
use crate::restore::{
    ArchiveEntry, ArchiveId, ByteRange, JobId, JobPage, JobStatus, RetrievalPolicy, VaultTarget,
};

/// Byte stream of a job's output.
pub type JobOutput = Pin<Box<dyn AsyncRead + Send>>;

/// Port for the vault service.
///
/// Range-based retrievals follow the vault protocol: a range starts at a
/// multiple of 1 MiB and, unless it ends at the last byte of the archive, its
/// length is a multiple of 1 MiB.
#[async_trait]
pub trait VaultClientPort: Send + Sync {
    /// List the names of every vault in the account.
    async fn list_vaults(&self) -> Result<Vec<String>, VaultError>;

    /// List one page of the jobs known to `vault`.
    ///
    /// Every returned descriptor carries `vault.role`.
    async fn list_jobs(
        &self,
        vault: &VaultTarget,
        marker: Option<String>,
    ) -> Result<JobPage, VaultError>;

    /// Submit a retrieval job for `range` of an archive.
    ///
    /// Returns `RateLimited` when the vault refuses new work and
    /// `ArchiveNotFound` when the archive no longer exists.
    async fn submit_retrieval(
        &self,
        vault: &VaultTarget,
        archive_id: &ArchiveId,
        range: ByteRange,
    ) -> Result<JobId, VaultError>;

    /// Current status of a job.
    async fn poll_status(&self, vault: &VaultTarget, job_id: &JobId)
    -> Result<JobStatus, VaultError>;

    /// Stream `range` of a completed job's output.
    ///
    /// The range is relative to the job output, not to the archive.
    async fn fetch_output(
        &self,
        vault: &VaultTarget,
        job_id: &JobId,
        range: ByteRange,
    ) -> Result<JobOutput, VaultError>;

    /// Submit an inventory job listing the archives of `vault`.
    async fn submit_catalogue_discovery(&self, vault: &VaultTarget) -> Result<JobId, VaultError>;

    /// Read the catalogue archive from a completed inventory job.
    async fn fetch_catalogue_archive(
        &self,
        vault: &VaultTarget,
        job_id: &JobId,
    ) -> Result<ArchiveEntry, VaultError>;

    /// The account's data retrieval policy.
    async fn retrieval_policy(&self) -> Result<RetrievalPolicy, VaultError>;
}
