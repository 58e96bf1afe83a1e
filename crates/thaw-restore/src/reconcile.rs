//! Startup job reconciliation.
//!
//! Lists every job known to both vaults and indexes the reusable ones, so a
//! restarted run picks up the jobs a previous run already paid for instead of
//! submitting duplicates.

use std::collections::{HashMap, HashSet};

use thaw_core::{
    ArchiveId, ByteRange, JobAction, JobDescriptor, JobId, RestoreResult, VaultClientPort,
    VaultPair, VaultRole,
};

use crate::cache::RunCache;

/// Reusable jobs found on the vaults, by role.
#[derive(Debug, Default)]
pub struct JobIndex {
    catalogue_discovery: Option<JobId>,
    catalogue_retrievals: HashMap<ArchiveId, JobId>,
    archive_jobs: HashMap<(ArchiveId, ByteRange), JobId>,
    /// Every reusable data retrieval, including those listed without a range.
    listed_data_jobs: HashSet<JobId>,
}

impl JobIndex {
    /// Index one listed job. Failed jobs and descriptors without the fields
    /// their role requires are ignored.
    pub fn observe(&mut self, job: JobDescriptor) {
        if !job.status.is_reusable() {
            return;
        }
        match (job.role, job.action) {
            // Listings are oldest first; the newest discovery wins.
            (VaultRole::Catalogue, JobAction::Inventory) => {
                self.catalogue_discovery = Some(job.id);
            }
            (VaultRole::Catalogue, JobAction::ArchiveRetrieval) => {
                if let Some(archive_id) = job.archive_id {
                    self.catalogue_retrievals.insert(archive_id, job.id);
                }
            }
            (VaultRole::Data, JobAction::ArchiveRetrieval) => {
                self.listed_data_jobs.insert(job.id.clone());
                if let (Some(archive_id), Some(range)) = (job.archive_id, job.byte_range) {
                    self.archive_jobs.insert((archive_id, range), job.id);
                }
            }
            (VaultRole::Data, JobAction::Inventory) => {}
        }
    }

    /// Take the job staging exactly `range` of `archive_id`, if any.
    ///
    /// A job is handed out once; a second request for the same range submits fresh.
    pub fn take_archive_job(&mut self, archive_id: &ArchiveId, range: ByteRange) -> Option<JobId> {
        self.archive_jobs.remove(&(archive_id.clone(), range))
    }

    pub const fn catalogue_discovery(&self) -> Option<&JobId> {
        self.catalogue_discovery.as_ref()
    }

    pub fn catalogue_retrieval_for(&self, archive_id: &ArchiveId) -> Option<&JobId> {
        self.catalogue_retrievals.get(archive_id)
    }

    pub fn archive_job_count(&self) -> usize {
        self.archive_jobs.len()
    }

    fn is_listed(&self, job_id: &JobId) -> bool {
        self.catalogue_discovery.as_ref() == Some(job_id)
            || self.catalogue_retrievals.values().any(|j| j == job_id)
            || self.listed_data_jobs.contains(job_id)
    }

    /// Align the run cache with the listing.
    ///
    /// The listing is authoritative for liveness: cached archive jobs it no
    /// longer shows have expired or failed and are dropped. Surviving cached
    /// entries are merged into the index and win over another listed job for
    /// the same range. Listed jobs are not copied into the cache; it only
    /// holds jobs this tool admitted and has not consumed yet.
    pub fn sync_cache(&mut self, cache: &mut RunCache) -> RestoreResult<()> {
        let listed = &self.listed_data_jobs;
        cache.retain_archive_jobs(|cached| {
            let live = listed.contains(&cached.job_id);
            if !live {
                tracing::warn!(
                    job_id = %cached.job_id,
                    archive_id = %cached.archive_id,
                    range = %cached.range,
                    "Cached retrieval job is gone from the vault, it will be resubmitted"
                );
            }
            live
        })?;
        for cached in cache.archive_jobs() {
            self.archive_jobs
                .insert((cached.archive_id.clone(), cached.range), cached.job_id.clone());
        }

        match cache.catalogue_discovery_job().cloned() {
            Some(cached) if !self.is_listed(&cached) => {
                tracing::warn!(job_id = %cached, "Cached catalogue discovery job expired");
                cache.set_catalogue_discovery_job(self.catalogue_discovery.clone())?;
            }
            None if self.catalogue_discovery.is_some() => {
                cache.set_catalogue_discovery_job(self.catalogue_discovery.clone())?;
            }
            _ => {}
        }

        let listed_retrieval = cache
            .catalogue_archive()
            .and_then(|archive| self.catalogue_retrieval_for(&archive.archive_id))
            .cloned();
        match cache.catalogue_retrieval_job().cloned() {
            Some(cached) if !self.is_listed(&cached) => {
                tracing::warn!(job_id = %cached, "Cached catalogue retrieval job expired");
                cache.set_catalogue_retrieval_job(listed_retrieval)?;
            }
            None if listed_retrieval.is_some() => {
                cache.set_catalogue_retrieval_job(listed_retrieval)?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// List every job on both vaults and index the reusable ones.
pub async fn reconcile(client: &dyn VaultClientPort, vaults: &VaultPair) -> RestoreResult<JobIndex> {
    let mut index = JobIndex::default();
    let mut listed = 0_usize;

    for target in vaults.targets() {
        let mut marker = None;
        loop {
            let page = client.list_jobs(target, marker).await?;
            listed += page.jobs.len();
            for job in page.jobs {
                index.observe(job);
            }
            marker = page.marker;
            if marker.is_none() {
                break;
            }
        }
    }

    tracing::info!(
        listed,
        reusable_archive_jobs = index.archive_job_count(),
        catalogue_discovery = index.catalogue_discovery().is_some(),
        "Reconciled vault jobs"
    );
    Ok(index)
}
