//! Retrieval admission control.
//!
//! Decides which archive to request next and how many bytes, within the
//! retrieval budget and the vault's range alignment rules.

use std::path::PathBuf;

use thaw_core::{
    ArchiveEntry, ArchiveId, ByteRange, JobId, MIB, RestoreEvent, RestoreResult, VaultError,
    align_down,
};

use crate::engine::RestoreEngine;
use crate::fanout::{
    copy_from_present, create_empty_files, existing_len, fan_out, is_present, staging_path,
    truncate_to,
};
use crate::polling::cancellable_sleep;
use crate::queue::{DownloadInFlight, RetrievalInFlight};

/// Result of one chunk submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// A new retrieval job was submitted.
    Started,
    /// A job from an earlier run covers the range and was reused.
    Resumed,
    /// The archive is gone from the vault; its remaining bytes are abandoned.
    Skipped,
    /// Nothing can be requested until the pump frees budget.
    Retry,
}

/// Next range to request, or `None` when the budget cannot hold an aligned
/// chunk.
///
/// Every range starts at `next`, which is always MiB aligned. Only the final
/// chunk of an archive may have a length that is not a multiple of 1 MiB.
pub fn plan_chunk(next: u64, total: u64, budget_left: u64) -> Option<ByteRange> {
    debug_assert_eq!(next % MIB, 0);
    let remaining = total.saturating_sub(next);
    if remaining <= budget_left {
        return ByteRange::with_len(next, remaining);
    }
    ByteRange::with_len(next, align_down(budget_left, MIB))
}

enum Submission {
    Submitted(JobId),
    Deferred,
    NotFound,
}

impl RestoreEngine<'_> {
    /// Submit chunks until the budget is spent, the queue is full, the
    /// catalogue is exhausted or an attempt asks to retry later.
    pub(crate) async fn admit(&mut self) -> RestoreResult<()> {
        let max_in_flight = self
            .ctx
            .settings
            .max_in_flight_retrieval_bytes(self.throughput.bytes_per_second());

        while self.in_flight_retrieval_bytes < max_in_flight && self.queue.has_capacity() {
            if self.retrieval.is_none() {
                self.retrieval = self.select_next_archive().await?;
                if self.retrieval.is_none() {
                    break;
                }
            }
            if self.submit_next_chunk(max_in_flight).await? == AdmissionOutcome::Retry {
                break;
            }
        }
        Ok(())
    }

    /// Pull catalogue entries until one needs retrieving.
    async fn select_next_archive(&mut self) -> RestoreResult<Option<RetrievalInFlight>> {
        loop {
            let Some(cursor) = self.archives.as_mut() else {
                return Ok(None);
            };
            let Some(entry) = cursor.next().await.transpose()? else {
                tracing::debug!("Catalogue exhausted");
                self.archives = None;
                return Ok(None);
            };
            if let Some(retrieval) = self.prepare_archive(entry).await? {
                tracing::debug!(
                    archive_id = %retrieval.archive_id,
                    bytes = retrieval.remaining(),
                    "Selected archive to retrieve"
                );
                return Ok(Some(retrieval));
            }
        }
    }

    /// Handle an archive locally when possible; otherwise describe what is
    /// left to retrieve.
    async fn prepare_archive(
        &mut self,
        entry: ArchiveEntry,
    ) -> RestoreResult<Option<RetrievalInFlight>> {
        let ArchiveEntry { archive_id, size } = entry;
        let targets = self.destination_paths(&archive_id).await?;

        let mut all_present = true;
        for target in &targets {
            if !is_present(target, size).await? {
                all_present = false;
                break;
            }
        }
        if all_present {
            tracing::debug!(%archive_id, "All files of archive already exist");
            self.summary.archives_skipped += 1;
            self.finish_without_download(archive_id, size, "already restored");
            return Ok(None);
        }

        if size == 0 {
            create_empty_files(&targets).await?;
            self.archive_restored(archive_id, targets, size);
            return Ok(None);
        }

        if copy_from_present(&targets, size).await? {
            tracing::debug!(%archive_id, "Restored archive from an existing copy");
            self.archive_restored(archive_id, targets, size);
            return Ok(None);
        }

        let staging = staging_path(&self.destination, &archive_id);
        match existing_len(&staging).await? {
            Some(len) if len >= size => {
                tracing::debug!(%archive_id, "Local archive is complete");
                if len > size {
                    truncate_to(&staging, size).await?;
                }
                fan_out(&staging, &targets, size).await?;
                self.archive_restored(archive_id, targets, size);
                Ok(None)
            }
            Some(len) => {
                let start = align_down(len, MIB);
                tracing::info!(%archive_id, downloaded = len, resume_at = start, "Resuming partial archive");
                self.restored_bytes += start;
                Ok(Some(RetrievalInFlight::new(archive_id, size, start)))
            }
            None => Ok(Some(RetrievalInFlight::new(archive_id, size, 0))),
        }
    }

    fn finish_without_download(&mut self, archive_id: ArchiveId, size: u64, reason: &str) {
        self.restored_bytes += size;
        self.ctx.observer.emit(RestoreEvent::ArchiveSkipped {
            archive_id,
            reason: reason.to_string(),
        });
        self.report_progress();
    }

    fn archive_restored(&mut self, archive_id: ArchiveId, targets: Vec<PathBuf>, size: u64) {
        self.summary.archives_restored += 1;
        self.restored_bytes += size;
        self.ctx.observer.emit(RestoreEvent::ArchiveRestored {
            archive_id,
            paths: targets,
        });
        self.report_progress();
    }

    /// Request the next chunk of the archive being retrieved.
    async fn submit_next_chunk(&mut self, max_in_flight: u64) -> RestoreResult<AdmissionOutcome> {
        let Some(retrieval) = self.retrieval.clone() else {
            return Ok(AdmissionOutcome::Retry);
        };
        let budget_left = max_in_flight.saturating_sub(self.in_flight_retrieval_bytes);
        let Some(range) = plan_chunk(
            retrieval.next_byte_index_to_retrieve,
            retrieval.total_size,
            budget_left,
        ) else {
            tracing::debug!(budget_left, "Retrieval budget cannot hold an aligned chunk");
            return Ok(AdmissionOutcome::Retry);
        };
        let archive_id = retrieval.archive_id;

        let (job_id, outcome) = if let Some(job_id) = self.index.take_archive_job(&archive_id, range) {
            tracing::info!(%job_id, %archive_id, %range, "Retrieval job is in progress");
            self.summary.jobs_reused += 1;
            (job_id, AdmissionOutcome::Resumed)
        } else {
            match self.submit_retrieval(&archive_id, range).await? {
                Submission::Submitted(job_id) => {
                    tracing::info!(%job_id, %archive_id, %range, "Retrieval job has started");
                    self.summary.jobs_submitted += 1;
                    (job_id, AdmissionOutcome::Started)
                }
                Submission::Deferred => return Ok(AdmissionOutcome::Retry),
                Submission::NotFound => {
                    tracing::warn!(%archive_id, "Archive not found, skipped");
                    self.retrieval = None;
                    self.summary.archives_missing += 1;
                    self.ctx.observer.emit(RestoreEvent::ArchiveSkipped {
                        archive_id,
                        reason: "not found in vault".to_string(),
                    });
                    return Ok(AdmissionOutcome::Skipped);
                }
            }
        };

        self.cache.record_archive_job(&archive_id, range, &job_id)?;
        self.ctx.observer.emit(RestoreEvent::RetrievalAdmitted {
            archive_id: archive_id.clone(),
            range,
            job_id: job_id.clone(),
            reused: outcome == AdmissionOutcome::Resumed,
        });
        self.queue.push_back(DownloadInFlight::new(
            job_id,
            archive_id,
            range,
            retrieval.total_size,
        ));
        self.in_flight_retrieval_bytes += range.len();

        if let Some(active) = self.retrieval.as_mut() {
            active.advance(range);
            if active.is_complete() {
                tracing::debug!(archive_id = %active.archive_id, "Archive fully requested");
                self.retrieval = None;
            }
        }
        Ok(outcome)
    }

    /// Submit one retrieval job on the data vault.
    ///
    /// A rate-limited submission defers while downloads are pending, since
    /// draining them frees budget. With nothing to download it sleeps out the
    /// cooldown and tries again.
    async fn submit_retrieval(
        &mut self,
        archive_id: &ArchiveId,
        range: ByteRange,
    ) -> RestoreResult<Submission> {
        loop {
            match self
                .ctx
                .client
                .submit_retrieval(&self.ctx.vaults.data, archive_id, range)
                .await
            {
                Ok(job_id) => return Ok(Submission::Submitted(job_id)),
                Err(VaultError::RateLimited { message }) => {
                    if self.has_pending_downloads() {
                        tracing::info!(%message, "Rate limit reached, downloading before retrying");
                        return Ok(Submission::Deferred);
                    }
                    tracing::warn!(
                        %message,
                        cooldown_secs = self.ctx.settings.rate_limit_cooldown.as_secs(),
                        "Rate limit reached, waiting"
                    );
                    cancellable_sleep(self.ctx.settings.rate_limit_cooldown, self.ctx.cancel).await?;
                }
                Err(VaultError::ArchiveNotFound { .. }) => return Ok(Submission::NotFound),
                Err(e) => return Err(e.into()),
            }
        }
    }
}
