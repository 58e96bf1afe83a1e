//! Blocking waits on remote jobs.
//!
//! Vault jobs have no completion notification, so the engine polls at a fixed
//! interval. Every sleep observes the run's cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use thaw_core::{
    JobId, JobStatus, RestoreError, RestoreEvent, RestoreObserver, RestoreResult,
    VaultClientPort, VaultError, VaultTarget,
};

/// Sleep for `duration` unless the run is cancelled first.
pub async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> RestoreResult<()> {
    tokio::select! {
        () = cancel.cancelled() => Err(RestoreError::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Drive `future` to completion unless the run is cancelled first.
pub async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> RestoreResult<F::Output> {
    tokio::select! {
        () = cancel.cancelled() => Err(RestoreError::Cancelled),
        output = future => Ok(output),
    }
}

/// Submit a job, sleeping `cooldown` after every rate-limit rejection.
pub async fn submit_with_cooldown<F, Fut>(
    cooldown: Duration,
    cancel: &CancellationToken,
    mut submit: F,
) -> RestoreResult<JobId>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobId, VaultError>>,
{
    loop {
        match submit().await {
            Ok(job_id) => return Ok(job_id),
            Err(VaultError::RateLimited { message }) => {
                tracing::warn!(%message, cooldown_secs = cooldown.as_secs(), "Rate limit reached, waiting");
                cancellable_sleep(cooldown, cancel).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Poll `job_id` until the vault reports it succeeded.
pub async fn wait_for_job(
    client: &dyn VaultClientPort,
    vault: &VaultTarget,
    job_id: &JobId,
    poll_interval: Duration,
    cancel: &CancellationToken,
    observer: &dyn RestoreObserver,
) -> RestoreResult<()> {
    let mut announced = false;
    loop {
        if cancel.is_cancelled() {
            return Err(RestoreError::Cancelled);
        }

        match client.poll_status(vault, job_id).await? {
            JobStatus::Succeeded => {
                tracing::debug!(%job_id, vault = %vault.name, "Job is ready");
                return Ok(());
            }
            JobStatus::Failed => {
                return Err(RestoreError::JobFailed {
                    job_id: job_id.clone(),
                });
            }
            JobStatus::InProgress => {
                if !announced {
                    tracing::info!(%job_id, vault = %vault.name, "Waiting for job to complete");
                    observer.emit(RestoreEvent::WaitingForJob {
                        job_id: job_id.clone(),
                    });
                    announced = true;
                }
                cancellable_sleep(poll_interval, cancel).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use thaw_core::{
        ArchiveEntry, ArchiveId, ByteRange, JobOutput, JobPage, RetrievalPolicy, VaultPair,
    };

    use crate::test_support::RecordingObserver;

    mockall::mock! {
        Client {}

        #[async_trait::async_trait]
        impl VaultClientPort for Client {
            async fn list_vaults(&self) -> Result<Vec<String>, VaultError>;
            async fn list_jobs(&self, vault: &VaultTarget, marker: Option<String>) -> Result<JobPage, VaultError>;
            async fn submit_retrieval(&self, vault: &VaultTarget, archive_id: &ArchiveId, range: ByteRange) -> Result<JobId, VaultError>;
            async fn poll_status(&self, vault: &VaultTarget, job_id: &JobId) -> Result<JobStatus, VaultError>;
            async fn fetch_output(&self, vault: &VaultTarget, job_id: &JobId, range: ByteRange) -> Result<JobOutput, VaultError>;
            async fn submit_catalogue_discovery(&self, vault: &VaultTarget) -> Result<JobId, VaultError>;
            async fn fetch_catalogue_archive(&self, vault: &VaultTarget, job_id: &JobId) -> Result<ArchiveEntry, VaultError>;
            async fn retrieval_policy(&self) -> Result<RetrievalPolicy, VaultError>;
        }
    }

    #[tokio::test]
    async fn test_wait_polls_until_succeeded() {
        let mut client = MockClient::new();
        let polls = AtomicUsize::new(0);
        client.expect_poll_status().times(3).returning(move |_, _| {
            if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(JobStatus::InProgress)
            } else {
                Ok(JobStatus::Succeeded)
            }
        });
        let observer = RecordingObserver::default();
        let vaults = VaultPair::for_data_vault("v");

        wait_for_job(
            &client,
            &vaults.data,
            &JobId::new("j"),
            Duration::ZERO,
            &CancellationToken::new(),
            &observer,
        )
        .await
        .unwrap();

        assert_eq!(
            observer.events(),
            vec![RestoreEvent::WaitingForJob {
                job_id: JobId::new("j")
            }]
        );
    }

    #[tokio::test]
    async fn test_wait_reports_failed_job() {
        let mut client = MockClient::new();
        client
            .expect_poll_status()
            .times(1)
            .returning(|_, _| Ok(JobStatus::Failed));
        let vaults = VaultPair::for_data_vault("v");

        let result = wait_for_job(
            &client,
            &vaults.data,
            &JobId::new("j"),
            Duration::ZERO,
            &CancellationToken::new(),
            &RecordingObserver::default(),
        )
        .await;

        assert!(matches!(result, Err(RestoreError::JobFailed { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_sleep_returns_early() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = cancellable_sleep(Duration::from_secs(3600), &cancel).await;
        assert!(matches!(result, Err(RestoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_submit_retries_after_rate_limit() {
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);
        let job = submit_with_cooldown(Duration::ZERO, &cancel, || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(VaultError::rate_limited("slow down"))
            } else {
                Ok(JobId::new("job"))
            }
        })
        .await
        .unwrap();
        assert_eq!(job, JobId::new("job"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_submit_propagates_other_errors() {
        let cancel = CancellationToken::new();
        let result = submit_with_cooldown(Duration::ZERO, &cancel, || async {
            Err(VaultError::remote("boom"))
        })
        .await;
        assert!(matches!(result, Err(RestoreError::Vault(VaultError::Remote { .. }))));
    }
}
