//! Persistent run cache.
//!
//! Two files per vault. `cache.json` holds the catalogue entries and is
//! rewritten atomically when one of them changes, which happens a handful of
//! times per run. Per-archive jobs go to `cache.log`, an append-only log of
//! JSON lines: each submission or consumption appends one synced line, and the
//! log is compacted down to the live entries when the cache is loaded.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use thaw_core::{ArchiveEntry, ArchiveId, ByteRange, JobId, RestoreError, RestoreResult};

/// One outstanding per-archive retrieval job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedArchiveJob {
    pub archive_id: ArchiveId,
    pub range: ByteRange,
    pub job_id: JobId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct CatalogueState {
    catalogue_archive: Option<ArchiveEntry>,
    catalogue_discovery_job: Option<JobId>,
    catalogue_retrieval_job: Option<JobId>,
}

/// One line of the job log.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntry {
    Record(CachedArchiveJob),
    Drop { job_id: JobId },
}

/// Live per-archive jobs, addressable by job id and by `(archive, range)`.
#[derive(Debug, Default)]
struct ArchiveJobs {
    by_job: HashMap<JobId, CachedArchiveJob>,
    by_range: HashMap<(ArchiveId, ByteRange), JobId>,
}

impl ArchiveJobs {
    /// Apply a record. Returns `false` when it changes nothing.
    fn insert(&mut self, entry: CachedArchiveJob) -> bool {
        let key = (entry.archive_id.clone(), entry.range);
        if self.by_range.get(&key) == Some(&entry.job_id) {
            return false;
        }
        if let Some(replaced) = self.by_range.insert(key, entry.job_id.clone()) {
            self.by_job.remove(&replaced);
        }
        if let Some(previous) = self.by_job.insert(entry.job_id.clone(), entry) {
            self.by_range.remove(&(previous.archive_id, previous.range));
        }
        true
    }

    fn remove(&mut self, job_id: &JobId) -> Option<CachedArchiveJob> {
        let entry = self.by_job.remove(job_id)?;
        self.by_range.remove(&(entry.archive_id.clone(), entry.range));
        Some(entry)
    }

    fn apply(&mut self, entry: LogEntry) {
        match entry {
            LogEntry::Record(job) => {
                self.insert(job);
            }
            LogEntry::Drop { job_id } => {
                self.remove(&job_id);
            }
        }
    }

    /// Entries in a stable order for compaction.
    fn sorted(&self) -> Vec<&CachedArchiveJob> {
        let mut jobs: Vec<_> = self.by_job.values().collect();
        jobs.sort_by(|a, b| (&a.archive_id, a.range.start()).cmp(&(&b.archive_id, b.range.start())));
        jobs
    }
}

/// On-disk record of long-lived job identifiers.
#[derive(Debug)]
pub struct RunCache {
    path: PathBuf,
    log_path: PathBuf,
    catalogue: CatalogueState,
    jobs: ArchiveJobs,
    log: File,
}

impl RunCache {
    /// Load the cache at `path`, starting empty when the files do not exist.
    ///
    /// An unreadable catalogue document is discarded with a warning, and so is
    /// any unreadable log line: reconciliation recovers archive jobs from the
    /// vault listing anyway. The job log is compacted before it is reopened
    /// for appending.
    pub fn load(path: impl Into<PathBuf>) -> RestoreResult<Self> {
        let path = path.into();
        let log_path = path.with_extension("log");

        let catalogue = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable run cache");
                CatalogueState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CatalogueState::default(),
            Err(e) => return Err(RestoreError::io(&path, e)),
        };

        let jobs = read_log(&log_path)?;
        let dir = parent_dir(&log_path);
        let lines = jobs
            .sorted()
            .into_iter()
            .map(|job| encode(&LogEntry::Record(job.clone())))
            .collect::<RestoreResult<Vec<_>>>()?;
        write_atomic(dir, &log_path, &lines.concat())?;

        let log = OpenOptions::new()
            .append(true)
            .open(&log_path)
            .map_err(|e| RestoreError::io(&log_path, e))?;
        tracing::debug!(
            path = %log_path.display(),
            archive_jobs = jobs.by_job.len(),
            "Loaded run cache"
        );

        Ok(Self {
            path,
            log_path,
            catalogue,
            jobs,
            log,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn save_catalogue(&self) -> RestoreResult<()> {
        let json = serde_json::to_vec_pretty(&self.catalogue)
            .map_err(|e| RestoreError::cache(e.to_string()))?;
        write_atomic(parent_dir(&self.path), &self.path, &json)
    }

    fn append(&mut self, entry: &LogEntry) -> RestoreResult<()> {
        let line = encode(entry)?;
        self.log
            .write_all(&line)
            .and_then(|()| self.log.sync_data())
            .map_err(|e| RestoreError::io(&self.log_path, e))
    }

    pub const fn catalogue_archive(&self) -> Option<&ArchiveEntry> {
        self.catalogue.catalogue_archive.as_ref()
    }

    pub fn set_catalogue_archive(&mut self, archive: ArchiveEntry) -> RestoreResult<()> {
        self.catalogue.catalogue_archive = Some(archive);
        self.save_catalogue()
    }

    pub const fn catalogue_discovery_job(&self) -> Option<&JobId> {
        self.catalogue.catalogue_discovery_job.as_ref()
    }

    pub fn set_catalogue_discovery_job(&mut self, job_id: Option<JobId>) -> RestoreResult<()> {
        self.catalogue.catalogue_discovery_job = job_id;
        self.save_catalogue()
    }

    pub const fn catalogue_retrieval_job(&self) -> Option<&JobId> {
        self.catalogue.catalogue_retrieval_job.as_ref()
    }

    pub fn set_catalogue_retrieval_job(&mut self, job_id: Option<JobId>) -> RestoreResult<()> {
        self.catalogue.catalogue_retrieval_job = job_id;
        self.save_catalogue()
    }

    /// Forget the catalogue entirely once it has been downloaded.
    pub fn clear_catalogue(&mut self) -> RestoreResult<()> {
        self.catalogue = CatalogueState::default();
        self.save_catalogue()
    }

    /// Outstanding per-archive jobs, in no particular order.
    pub fn archive_jobs(&self) -> impl Iterator<Item = &CachedArchiveJob> {
        self.jobs.by_job.values()
    }

    pub fn archive_job_count(&self) -> usize {
        self.jobs.by_job.len()
    }

    /// The cached job staging exactly `range` of `archive_id`.
    pub fn archive_job(&self, archive_id: &ArchiveId, range: ByteRange) -> Option<&JobId> {
        self.jobs.by_range.get(&(archive_id.clone(), range))
    }

    /// Record a per-archive job, replacing any entry for the same range.
    pub fn record_archive_job(
        &mut self,
        archive_id: &ArchiveId,
        range: ByteRange,
        job_id: &JobId,
    ) -> RestoreResult<()> {
        let entry = CachedArchiveJob {
            archive_id: archive_id.clone(),
            range,
            job_id: job_id.clone(),
        };
        if !self.jobs.insert(entry.clone()) {
            return Ok(());
        }
        self.append(&LogEntry::Record(entry))
    }

    /// Drop a consumed per-archive job.
    pub fn remove_archive_job(&mut self, job_id: &JobId) -> RestoreResult<()> {
        if self.jobs.remove(job_id).is_none() {
            return Ok(());
        }
        self.append(&LogEntry::Drop {
            job_id: job_id.clone(),
        })
    }

    /// Keep only the per-archive jobs accepted by `keep`.
    pub fn retain_archive_jobs(
        &mut self,
        mut keep: impl FnMut(&CachedArchiveJob) -> bool,
    ) -> RestoreResult<()> {
        let dropped: Vec<JobId> = self
            .jobs
            .by_job
            .values()
            .filter(|job| !keep(job))
            .map(|job| job.job_id.clone())
            .collect();
        for job_id in dropped {
            self.remove_archive_job(&job_id)?;
        }
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn encode(entry: &LogEntry) -> RestoreResult<Vec<u8>> {
    let mut line = serde_json::to_vec(entry).map_err(|e| RestoreError::cache(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Replay the job log. A line cut short by a crash is skipped.
fn read_log(path: &Path) -> RestoreResult<ArchiveJobs> {
    let mut jobs = ArchiveJobs::default();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(jobs),
        Err(e) => return Err(RestoreError::io(path, e)),
    };
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| RestoreError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => jobs.apply(entry),
            Err(e) => {
                tracing::warn!(path = %path.display(), line = number + 1, error = %e, "Skipping unreadable job log line");
            }
        }
    }
    Ok(jobs)
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> RestoreResult<()> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| RestoreError::io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| RestoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| RestoreError::io(path, e.error))?;
    Ok(())
}
