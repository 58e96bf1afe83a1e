//! Orchestration loop.
//!
//! One run alternates two stages until everything is drained:
//!
//! 1. **Admission** fills the retrieval budget with range retrieval jobs, or
//!    stops early when the budget or the vault says to wait.
//! 2. **Pump** downloads at most one pass worth of bytes from the oldest jobs.
//!
//! Both stages share the budget counters kept here. The throughput estimate
//! measured by the pump resizes both budgets for the next iteration.

use std::path::PathBuf;

use thaw_core::{
    ArchiveEntry, ArchiveId, CatalogueCursor, CatalogueReaderPort, PathFilters, RestoreError,
    RestoreEvent, RestorePhase, RestoreResult,
};

use crate::cache::RunCache;
use crate::context::RunContext;
use crate::fanout::{remove_staging_dir, resolve_destination};
use crate::queue::{DownloadInFlight, InFlightQueue, RetrievalInFlight};
use crate::reconcile::JobIndex;
use crate::throughput::ThroughputEstimator;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Archives materialized at their destination paths during this run.
    pub archives_restored: u64,
    /// Archives whose every destination path already held the content.
    pub archives_skipped: u64,
    /// Archives the vault reported as gone.
    pub archives_missing: u64,
    pub bytes_downloaded: u64,
    pub jobs_submitted: u64,
    pub jobs_reused: u64,
}

/// State of one restore run over the archive vault.
pub struct RestoreEngine<'a> {
    pub(crate) ctx: RunContext<'a>,
    pub(crate) catalogue: &'a dyn CatalogueReaderPort,
    pub(crate) cache: &'a mut RunCache,
    pub(crate) index: JobIndex,
    pub(crate) destination: PathBuf,
    pub(crate) throughput: ThroughputEstimator,
    /// Remaining catalogue archives; `None` once exhausted.
    pub(crate) archives: Option<CatalogueCursor<ArchiveEntry>>,
    pub(crate) retrieval: Option<RetrievalInFlight>,
    pub(crate) queue: InFlightQueue,
    pub(crate) current: Option<DownloadInFlight>,
    /// Bytes requested from the vault and not yet written locally.
    pub(crate) in_flight_retrieval_bytes: u64,
    pub(crate) restored_bytes: u64,
    pub(crate) total_bytes: u64,
    pub(crate) summary: RestoreSummary,
}

impl<'a> RestoreEngine<'a> {
    pub async fn new(
        ctx: RunContext<'a>,
        catalogue: &'a dyn CatalogueReaderPort,
        cache: &'a mut RunCache,
        index: JobIndex,
        destination: PathBuf,
        filters: &PathFilters,
        throughput: ThroughputEstimator,
    ) -> RestoreResult<Self> {
        let total_bytes = catalogue.total_size(filters).await?;
        let archives = catalogue.iterate_archives(filters).await?;
        Ok(Self {
            queue: InFlightQueue::new(ctx.settings.max_queued_jobs),
            ctx,
            catalogue,
            cache,
            index,
            destination,
            throughput,
            archives: Some(archives),
            retrieval: None,
            current: None,
            in_flight_retrieval_bytes: 0,
            restored_bytes: 0,
            total_bytes,
            summary: RestoreSummary::default(),
        })
    }

    /// Run admission and download passes until every archive is handled.
    pub async fn run(mut self) -> RestoreResult<RestoreSummary> {
        tracing::info!(
            total_bytes = self.total_bytes,
            destination = %self.destination.display(),
            bytes_per_second = self.throughput.bytes_per_second(),
            "Restoring archives"
        );
        self.ctx.observer.emit(RestoreEvent::PhaseChanged {
            phase: RestorePhase::Archives,
        });
        self.report_progress();

        while !self.is_drained() {
            if self.ctx.cancel.is_cancelled() {
                return Err(RestoreError::Cancelled);
            }
            self.admit().await?;
            self.pump_pass().await?;
        }

        remove_staging_dir(&self.destination).await?;
        self.ctx.observer.emit(RestoreEvent::PhaseChanged {
            phase: RestorePhase::Done,
        });
        tracing::info!(
            restored = self.summary.archives_restored,
            skipped = self.summary.archives_skipped,
            missing = self.summary.archives_missing,
            bytes = self.summary.bytes_downloaded,
            "Restore complete"
        );
        Ok(self.summary)
    }

    /// Catalogue exhausted and nothing requested or downloading.
    pub(crate) fn is_drained(&self) -> bool {
        self.archives.is_none()
            && self.retrieval.is_none()
            && self.queue.is_empty()
            && self.current.is_none()
    }

    /// Any job submitted and not fully downloaded.
    pub(crate) fn has_pending_downloads(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }

    pub(crate) fn report_progress(&self) {
        self.ctx.observer.emit(RestoreEvent::Progress {
            restored_bytes: self.restored_bytes.min(self.total_bytes),
            total_bytes: self.total_bytes,
        });
    }

    /// Destination paths of an archive, dropping catalogue paths that escape
    /// the destination tree.
    pub(crate) async fn destination_paths(
        &self,
        archive_id: &ArchiveId,
    ) -> RestoreResult<Vec<PathBuf>> {
        let paths = self.catalogue.paths_for_archive(archive_id).await?;
        Ok(paths
            .iter()
            .filter_map(|path| {
                let resolved = resolve_destination(&self.destination, path);
                if resolved.is_none() {
                    tracing::warn!(%path, %archive_id, "Ignoring catalogue path outside the destination");
                }
                resolved
            })
            .collect())
    }
}
