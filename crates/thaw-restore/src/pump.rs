//! Download pump.
//!
//! Downloads job output in submission order, at most one pass budget per
//! call. Bytes land at their absolute archive offset in the staging file, so
//! multi-job archives and resumed runs converge on one ordered file.

use std::io::SeekFrom;
use std::time::Instant;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use thaw_core::{ByteRange, RestoreError, RestoreEvent, RestoreResult, ensure_private_dir};

use crate::engine::RestoreEngine;
use crate::fanout::{existing_len, fan_out, staging_path};
use crate::polling::until_cancelled;
use crate::queue::DownloadInFlight;
use crate::throughput::PassTimer;

impl RestoreEngine<'_> {
    /// Download up to one pass budget from the head of the queue, then
    /// re-estimate throughput.
    pub(crate) async fn pump_pass(&mut self) -> RestoreResult<()> {
        let budget = self
            .ctx
            .settings
            .download_pass_budget(self.throughput.bytes_per_second());
        let mut timer = PassTimer::default();

        while timer.bytes() < budget {
            if self.current.is_none() {
                self.current = self.queue.pop_front();
            }
            let Some(mut download) = self.current.take() else {
                break;
            };

            if !download.ready {
                self.ctx.wait(&self.ctx.vaults.data, &download.job_id).await?;
                download.ready = true;
            }

            if let Some(chunk) = download.next_output_range(budget - timer.bytes()) {
                let started = Instant::now();
                let written = self.write_chunk(&download, chunk).await?;
                timer.record(written, started.elapsed());

                download.written += written;
                self.in_flight_retrieval_bytes = self.in_flight_retrieval_bytes.saturating_sub(written);
                self.restored_bytes += written;
                self.summary.bytes_downloaded += written;
                self.report_progress();
            }

            if download.is_complete() {
                tracing::debug!(job_id = %download.job_id, archive_id = %download.archive_id, "Job output downloaded");
                self.cache.remove_archive_job(&download.job_id)?;
                self.complete_archive(&download).await?;
            } else {
                self.current = Some(download);
            }
        }

        debug_assert_eq!(
            self.in_flight_retrieval_bytes,
            self.queue.pending_bytes() + self.current.as_ref().map_or(0, DownloadInFlight::remaining)
        );
        tracing::debug!(
            downloaded = timer.bytes(),
            queued_jobs = self.queue.len(),
            in_flight_bytes = self.in_flight_retrieval_bytes,
            "Download pass finished"
        );

        if let Some(bytes_per_second) = self.throughput.observe(&timer) {
            tracing::debug!(bytes_per_second, "New download speed");
            self.ctx
                .observer
                .emit(RestoreEvent::ThroughputUpdated { bytes_per_second });
        }
        Ok(())
    }

    /// Stream `chunk` of the job output into the staging file.
    async fn write_chunk(&self, download: &DownloadInFlight, chunk: ByteRange) -> RestoreResult<u64> {
        let staging = staging_path(&self.destination, &download.archive_id);
        if let Some(parent) = staging.parent() {
            ensure_private_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&staging)
            .await
            .map_err(|e| RestoreError::io(&staging, e))?;
        let offset = download.next_byte_index_to_write();
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| RestoreError::io(&staging, e))?;

        let output = self
            .ctx
            .client
            .fetch_output(&self.ctx.vaults.data, &download.job_id, chunk)
            .await?;
        let mut limited = output.take(chunk.len());
        let received = until_cancelled(self.ctx.cancel, tokio::io::copy(&mut limited, &mut file))
            .await?
            .map_err(|e| RestoreError::io(&staging, e))?;
        file.flush()
            .await
            .map_err(|e| RestoreError::io(&staging, e))?;
        file.sync_data()
            .await
            .map_err(|e| RestoreError::io(&staging, e))?;

        tracing::debug!(
            job_id = %download.job_id,
            archive_id = %download.archive_id,
            offset,
            bytes = received,
            "Wrote job output"
        );
        if received != chunk.len() {
            return Err(RestoreError::TruncatedOutput {
                job_id: download.job_id.clone(),
                expected: chunk.len(),
                received,
            });
        }
        Ok(received)
    }

    /// Fan the archive out once every job of it has been written.
    async fn complete_archive(&mut self, download: &DownloadInFlight) -> RestoreResult<()> {
        let staging = staging_path(&self.destination, &download.archive_id);
        let size = download.archive_total_size;
        if existing_len(&staging).await?.unwrap_or(0) < size {
            return Ok(());
        }

        let targets = self.destination_paths(&download.archive_id).await?;
        fan_out(&staging, &targets, size).await?;
        tracing::info!(archive_id = %download.archive_id, files = targets.len(), "Archive restored");
        self.summary.archives_restored += 1;
        self.ctx.observer.emit(RestoreEvent::ArchiveRestored {
            archive_id: download.archive_id.clone(),
            paths: targets,
        });
        Ok(())
    }
}
