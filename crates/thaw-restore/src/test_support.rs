//! In-memory port implementations for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use thaw_core::{
    ArchiveEntry, ArchiveId, ByteRange, CatalogueCursor, CatalogueError, CatalogueFile,
    CatalogueReaderPort, JobAction, JobDescriptor, JobId, JobOutput, JobPage, JobStatus, MIB,
    PathFilters, RestoreEvent, RestoreObserver, RetrievalPolicy, VaultClientPort, VaultError,
    VaultPair, VaultRole, VaultTarget,
};

struct MockJob {
    id: JobId,
    vault: String,
    role: VaultRole,
    action: JobAction,
    archive_id: Option<ArchiveId>,
    range: Option<ByteRange>,
    polls_left: u32,
    failed: bool,
}

#[derive(Default)]
struct MockState {
    archives: HashMap<(String, ArchiveId), Vec<u8>>,
    missing: HashSet<ArchiveId>,
    jobs: Vec<MockJob>,
    next_id: usize,
    accepted_before_limit: usize,
    rate_limits_left: usize,
    fail_new_jobs: bool,
    poll_delay: u32,
    submissions: Vec<(String, ArchiveId, ByteRange)>,
    discoveries: usize,
    calls: usize,
    inventory: HashMap<String, ArchiveEntry>,
}

/// Vault double serving archives from memory.
///
/// Submissions are recorded, and every retrieval range is checked against the
/// alignment rules of the real service.
#[derive(Default)]
pub struct MockVault {
    state: Mutex<MockState>,
}

impl MockVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_archive(&self, vault: &str, archive_id: &str, content: Vec<u8>) {
        self.lock()
            .archives
            .insert((vault.to_string(), ArchiveId::new(archive_id)), content);
    }

    /// Make the catalogue vault's inventory report `archive_id`.
    pub fn set_inventory(&self, vault: &str, archive_id: &str, size: u64) {
        self.lock()
            .inventory
            .insert(vault.to_string(), ArchiveEntry::new(archive_id, size));
    }

    /// Report every retrieval of `archive_id` as not found.
    pub fn remove_archive(&self, archive_id: &str) {
        self.lock().missing.insert(ArchiveId::new(archive_id));
    }

    /// Accept `after` more submissions, then reject `count` as rate limited.
    pub fn rate_limit(&self, after: usize, count: usize) {
        let mut state = self.lock();
        state.accepted_before_limit = after;
        state.rate_limits_left = count;
    }

    /// Report every job submitted from now on as failed.
    pub fn fail_new_jobs(&self) {
        self.lock().fail_new_jobs = true;
    }

    /// Number of polls each new job reports in progress.
    pub fn set_poll_delay(&self, polls: u32) {
        self.lock().poll_delay = polls;
    }

    /// Register a job submitted by an earlier run.
    pub fn add_existing_job(
        &self,
        target: &VaultTarget,
        job_id: &str,
        action: JobAction,
        archive: Option<(&str, ByteRange)>,
    ) {
        let mut state = self.lock();
        let polls_left = state.poll_delay;
        state.jobs.push(MockJob {
            id: JobId::new(job_id),
            vault: target.name.clone(),
            role: target.role,
            action,
            archive_id: archive.map(|(id, _)| ArchiveId::new(id)),
            range: archive.map(|(_, range)| range),
            polls_left,
            failed: false,
        });
    }

    /// Retrieval submissions on `vault`, in order.
    pub fn submissions(&self, vault: &str) -> Vec<(ArchiveId, ByteRange)> {
        self.lock()
            .submissions
            .iter()
            .filter(|(v, _, _)| v == vault)
            .map(|(_, id, range)| (id.clone(), *range))
            .collect()
    }

    pub fn discovery_count(&self) -> usize {
        self.lock().discoveries
    }

    /// Every port call made so far.
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn new_job(state: &mut MockState, target: &VaultTarget, action: JobAction) -> JobId {
        state.next_id += 1;
        let id = JobId::new(format!("{}-job-{}", target.name, state.next_id));
        let polls_left = state.poll_delay;
        let failed = state.fail_new_jobs;
        state.jobs.push(MockJob {
            id: id.clone(),
            vault: target.name.clone(),
            role: target.role,
            action,
            archive_id: None,
            range: None,
            polls_left,
            failed,
        });
        id
    }
}

#[async_trait]
impl VaultClientPort for MockVault {
    async fn list_vaults(&self) -> Result<Vec<String>, VaultError> {
        let mut state = self.lock();
        state.calls += 1;
        let mut names: Vec<String> = state.archives.keys().map(|(v, _)| v.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn list_jobs(
        &self,
        vault: &VaultTarget,
        marker: Option<String>,
    ) -> Result<JobPage, VaultError> {
        let mut state = self.lock();
        state.calls += 1;
        let jobs: Vec<JobDescriptor> = state
            .jobs
            .iter()
            .filter(|j| j.vault == vault.name)
            .map(|j| JobDescriptor {
                id: j.id.clone(),
                role: vault.role,
                action: j.action,
                status: if j.failed {
                    JobStatus::Failed
                } else if j.polls_left > 0 {
                    JobStatus::InProgress
                } else {
                    JobStatus::Succeeded
                },
                archive_id: j.archive_id.clone(),
                byte_range: j.range,
                created_at: None,
            })
            .collect();
        // Two jobs per page to exercise pagination.
        let start: usize = marker.map_or(0, |m| m.parse().unwrap());
        let end = (start + 2).min(jobs.len());
        Ok(JobPage {
            jobs: jobs[start..end].to_vec(),
            marker: (end < jobs.len()).then(|| end.to_string()),
        })
    }

    async fn submit_retrieval(
        &self,
        vault: &VaultTarget,
        archive_id: &ArchiveId,
        range: ByteRange,
    ) -> Result<JobId, VaultError> {
        let mut state = self.lock();
        state.calls += 1;
        if state.accepted_before_limit > 0 {
            state.accepted_before_limit -= 1;
        } else if state.rate_limits_left > 0 {
            state.rate_limits_left -= 1;
            return Err(VaultError::rate_limited("policy enforced"));
        }
        if state.missing.contains(archive_id) {
            return Err(VaultError::archive_not_found(archive_id.as_str()));
        }
        let size = state
            .archives
            .get(&(vault.name.clone(), archive_id.clone()))
            .map(|c| c.len() as u64)
            .ok_or_else(|| VaultError::archive_not_found(archive_id.as_str()))?;

        assert_eq!(range.start() % MIB, 0, "misaligned range start {range}");
        assert!(range.end() < size, "range {range} past archive end {size}");
        if range.end() + 1 != size {
            assert_eq!(range.len() % MIB, 0, "misaligned non-final range {range}");
        }

        state
            .submissions
            .push((vault.name.clone(), archive_id.clone(), range));
        let id = Self::new_job(&mut state, vault, JobAction::ArchiveRetrieval);
        let job = state.jobs.last_mut().unwrap();
        job.archive_id = Some(archive_id.clone());
        job.range = Some(range);
        Ok(id)
    }

    async fn poll_status(
        &self,
        vault: &VaultTarget,
        job_id: &JobId,
    ) -> Result<JobStatus, VaultError> {
        let mut state = self.lock();
        state.calls += 1;
        let job = state
            .jobs
            .iter_mut()
            .find(|j| &j.id == job_id && j.vault == vault.name)
            .ok_or_else(|| VaultError::job_not_found(job_id.as_str()))?;
        if job.failed {
            return Ok(JobStatus::Failed);
        }
        if job.polls_left > 0 {
            job.polls_left -= 1;
            return Ok(JobStatus::InProgress);
        }
        Ok(JobStatus::Succeeded)
    }

    async fn fetch_output(
        &self,
        vault: &VaultTarget,
        job_id: &JobId,
        range: ByteRange,
    ) -> Result<JobOutput, VaultError> {
        let mut state = self.lock();
        state.calls += 1;
        let job = state
            .jobs
            .iter()
            .find(|j| &j.id == job_id && j.vault == vault.name)
            .ok_or_else(|| VaultError::job_not_found(job_id.as_str()))?;
        let (Some(archive_id), Some(job_range)) = (job.archive_id.clone(), job.range) else {
            return Err(VaultError::remote("job has no archive output"));
        };
        let content = &state.archives[&(vault.name.clone(), archive_id)];
        let start = usize::try_from(job_range.start() + range.start()).unwrap();
        let end = usize::try_from(job_range.start() + range.end_exclusive())
            .unwrap()
            .min(content.len());
        Ok(Box::pin(std::io::Cursor::new(content[start..end].to_vec())))
    }

    async fn submit_catalogue_discovery(&self, vault: &VaultTarget) -> Result<JobId, VaultError> {
        let mut state = self.lock();
        state.calls += 1;
        state.discoveries += 1;
        Ok(Self::new_job(&mut state, vault, JobAction::Inventory))
    }

    async fn fetch_catalogue_archive(
        &self,
        vault: &VaultTarget,
        _job_id: &JobId,
    ) -> Result<ArchiveEntry, VaultError> {
        let mut state = self.lock();
        state.calls += 1;
        state
            .inventory
            .get(&vault.name)
            .cloned()
            .ok_or_else(|| VaultError::remote("empty inventory"))
    }

    async fn retrieval_policy(&self) -> Result<RetrievalPolicy, VaultError> {
        Ok(RetrievalPolicy::FreeTier)
    }
}

/// Catalogue double over a list of rows.
pub struct MockCatalogue {
    files: Vec<CatalogueFile>,
}

impl MockCatalogue {
    pub fn new(rows: &[(&str, &str, u64)]) -> Self {
        Self {
            files: rows
                .iter()
                .map(|(path, archive_id, size)| CatalogueFile {
                    path: (*path).to_string(),
                    archive_id: ArchiveId::new(*archive_id),
                    size: *size,
                })
                .collect(),
        }
    }

    fn archives(&self, filters: &PathFilters) -> Vec<ArchiveEntry> {
        let mut archives: Vec<ArchiveEntry> = Vec::new();
        for file in self.files.iter().filter(|f| filters.matches(&f.path)) {
            match archives.iter_mut().find(|a| a.archive_id == file.archive_id) {
                Some(existing) => existing.size = existing.size.max(file.size),
                None => archives.push(ArchiveEntry::new(file.archive_id.clone(), file.size)),
            }
        }
        archives
    }
}

#[async_trait]
impl CatalogueReaderPort for MockCatalogue {
    async fn iterate_archives(
        &self,
        filters: &PathFilters,
    ) -> Result<CatalogueCursor<ArchiveEntry>, CatalogueError> {
        Ok(CatalogueCursor::from_vec(self.archives(filters)))
    }

    async fn paths_for_archive(&self, archive_id: &ArchiveId) -> Result<Vec<String>, CatalogueError> {
        let mut paths: Vec<String> = Vec::new();
        for file in self.files.iter().filter(|f| &f.archive_id == archive_id) {
            if !paths.contains(&file.path) {
                paths.push(file.path.clone());
            }
        }
        Ok(paths)
    }

    async fn total_size(&self, filters: &PathFilters) -> Result<u64, CatalogueError> {
        Ok(self.archives(filters).iter().map(|a| a.size).sum())
    }

    async fn list_files(
        &self,
        filters: &PathFilters,
    ) -> Result<CatalogueCursor<CatalogueFile>, CatalogueError> {
        Ok(CatalogueCursor::from_vec(
            self.files
                .iter()
                .filter(|f| filters.matches(&f.path))
                .cloned()
                .collect(),
        ))
    }
}

/// Observer keeping every event.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RestoreEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<RestoreEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl RestoreObserver for RecordingObserver {
    fn emit(&self, event: RestoreEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Deterministic archive content of `len` bytes.
pub fn content(seed: u8, len: u64) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_add((i % 251) as u8))
        .collect()
}

pub fn pair() -> VaultPair {
    VaultPair::for_data_vault("photos")
}
