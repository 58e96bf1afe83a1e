//! Shared borrows for one restore run.

use tokio_util::sync::CancellationToken;

use thaw_core::{
    JobId, RestoreError, RestoreObserver, RestoreResult, RestoreSettings, VaultClientPort,
    VaultError, VaultPair, VaultTarget,
};

use crate::polling::wait_for_job;

/// Ports and settings every stage of a run reads.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub client: &'a dyn VaultClientPort,
    pub observer: &'a dyn RestoreObserver,
    pub vaults: &'a VaultPair,
    pub settings: &'a RestoreSettings,
    pub cancel: &'a CancellationToken,
}

impl RunContext<'_> {
    /// Wait for a job to succeed.
    pub async fn wait(&self, vault: &VaultTarget, job_id: &JobId) -> RestoreResult<()> {
        wait_for_job(
            self.client,
            vault,
            job_id,
            self.settings.poll_interval,
            self.cancel,
            self.observer,
        )
        .await
    }

    /// Wait for a job that may have expired on the vault.
    ///
    /// Returns `false` when the vault no longer knows the job.
    pub async fn wait_unless_expired(
        &self,
        vault: &VaultTarget,
        job_id: &JobId,
    ) -> RestoreResult<bool> {
        match self.wait(vault, job_id).await {
            Ok(()) => Ok(true),
            Err(RestoreError::Vault(VaultError::JobNotFound { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
