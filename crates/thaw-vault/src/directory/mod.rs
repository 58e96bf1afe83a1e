//! Directory-backed vault client.
//!
//! Mirrors the behaviour of a cold-storage service closely enough to run real
//! restores against local data: jobs only complete after `job_delay`, expire
//! after `job_retention`, ranges must be 1 MiB aligned, and submissions can be
//! rate limited.

mod jobs;
mod layout;

use std::io::SeekFrom;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use thaw_core::{
    ArchiveEntry, ArchiveId, ByteRange, JobAction, JobId, JobOutput, JobPage, JobStatus, MIB,
    RetrievalPolicy, VaultClientPort, VaultError, VaultTarget,
};

use crate::config::DirectoryVaultConfig;
use crate::error::{StoreError, StoreResult};
use jobs::{JobRecord, JobStore};
use layout::Layout;

/// Vault client over a local directory tree.
pub struct DirectoryVault {
    layout: Layout,
    config: DirectoryVaultConfig,
}

impl DirectoryVault {
    pub fn new(config: DirectoryVaultConfig) -> Self {
        Self {
            layout: Layout::new(config.root.clone()),
            config,
        }
    }

    fn retention(&self) -> StoreResult<chrono::Duration> {
        chrono::Duration::from_std(self.config.job_retention)
            .map_err(|e| StoreError::InvalidRequest(format!("job retention: {e}")))
    }

    fn jobs(&self) -> StoreResult<JobStore<'_>> {
        Ok(JobStore::new(&self.layout, self.retention()?))
    }

    async fn check_rate_limit(&self, vault: &str) -> StoreResult<()> {
        let Some(max) = self.config.max_in_progress_jobs else {
            return Ok(());
        };
        let now = Utc::now();
        let in_progress = self
            .jobs()?
            .list(vault, now)
            .await?
            .iter()
            .filter(|job| job.status(now) == JobStatus::InProgress)
            .count();
        if in_progress >= max {
            return Err(StoreError::TooManyJobs { in_progress });
        }
        Ok(())
    }

    async fn create_job(
        &self,
        vault: &str,
        action: JobAction,
        archive_id: Option<String>,
        range: Option<ByteRange>,
    ) -> StoreResult<JobId> {
        self.check_rate_limit(vault).await?;

        let delay = chrono::Duration::from_std(self.config.job_delay)
            .map_err(|e| StoreError::InvalidRequest(format!("job delay: {e}")))?;
        let inventory = match action {
            JobAction::Inventory => Some(self.layout.inventory(vault).await?),
            JobAction::ArchiveRetrieval => None,
        };
        let created_at = Utc::now();
        let record = JobRecord {
            id: uuid::Uuid::new_v4().simple().to_string(),
            action,
            archive_id,
            range,
            created_at,
            ready_at: created_at + delay,
            inventory,
        };
        self.jobs()?.save(vault, &record).await?;

        tracing::debug!(vault, job_id = %record.id, %action, "Created job");
        Ok(JobId::new(record.id))
    }

    async fn completed_job(&self, vault: &str, job_id: &JobId) -> StoreResult<JobRecord> {
        let now = Utc::now();
        let record = self.jobs()?.load(vault, job_id.as_str(), now).await?;
        if record.status(now) != JobStatus::Succeeded {
            return Err(StoreError::InvalidRequest(format!(
                "job {job_id} is still in progress"
            )));
        }
        Ok(record)
    }
}

/// Check a retrieval range against the vault's alignment rules.
fn validate_range(range: ByteRange, archive_size: u64) -> StoreResult<()> {
    if range.end() >= archive_size {
        return Err(StoreError::InvalidRequest(format!(
            "range {range} exceeds archive size {archive_size}"
        )));
    }
    if range.start() % MIB != 0 {
        return Err(StoreError::InvalidRequest(format!(
            "range {range} does not start on a megabyte boundary"
        )));
    }
    let is_final = range.end() == archive_size - 1;
    if !is_final && range.len() % MIB != 0 {
        return Err(StoreError::InvalidRequest(format!(
            "range {range} is not a multiple of a megabyte"
        )));
    }
    Ok(())
}

/// Check an output sub-range against the job's output length.
fn validate_output_range(job_id: &JobId, range: ByteRange, output_len: u64) -> StoreResult<()> {
    if range.end() >= output_len {
        return Err(StoreError::InvalidRequest(format!(
            "range {range} exceeds output of job {job_id} ({output_len} bytes)"
        )));
    }
    Ok(())
}

#[async_trait]
impl VaultClientPort for DirectoryVault {
    async fn list_vaults(&self) -> Result<Vec<String>, VaultError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(self.layout.root())
            .await
            .map_err(StoreError::from)?;
        while let Some(entry) = entries.next_entry().await.map_err(StoreError::from)? {
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn list_jobs(
        &self,
        vault: &VaultTarget,
        marker: Option<String>,
    ) -> Result<JobPage, VaultError> {
        let now = Utc::now();
        let records = self.jobs()?.list(&vault.name, now).await?;

        let offset = match marker {
            Some(m) => m
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidRequest(format!("invalid marker '{m}'")))?,
            None => 0,
        };
        let page_size = self.config.page_size.max(1);
        let end = (offset + page_size).min(records.len());

        let jobs = records
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|r| r.descriptor(vault.role, now))
            .collect();
        let marker = (end < records.len()).then(|| end.to_string());
        Ok(JobPage { jobs, marker })
    }

    async fn submit_retrieval(
        &self,
        vault: &VaultTarget,
        archive_id: &ArchiveId,
        range: ByteRange,
    ) -> Result<JobId, VaultError> {
        let path = self.layout.archive_path(&vault.name, archive_id.as_str())?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::ArchiveMissing(archive_id.to_string()).into());
            }
            Err(e) => return Err(StoreError::from(e).into()),
        };
        validate_range(range, metadata.len())?;

        let job_id = self
            .create_job(
                &vault.name,
                JobAction::ArchiveRetrieval,
                Some(archive_id.to_string()),
                Some(range),
            )
            .await?;
        Ok(job_id)
    }

    async fn poll_status(
        &self,
        vault: &VaultTarget,
        job_id: &JobId,
    ) -> Result<JobStatus, VaultError> {
        let now = Utc::now();
        let record = self.jobs()?.load(&vault.name, job_id.as_str(), now).await?;
        Ok(record.status(now))
    }

    async fn fetch_output(
        &self,
        vault: &VaultTarget,
        job_id: &JobId,
        range: ByteRange,
    ) -> Result<JobOutput, VaultError> {
        let record = self.completed_job(&vault.name, job_id).await?;

        match record.action {
            JobAction::ArchiveRetrieval => {
                let (Some(archive_id), Some(job_range)) = (&record.archive_id, record.range) else {
                    return Err(StoreError::InvalidRequest(format!(
                        "job {job_id} has no archive range"
                    ))
                    .into());
                };
                validate_output_range(job_id, range, job_range.len())?;

                let path = self.layout.archive_path(&vault.name, archive_id)?;
                let mut file = match tokio::fs::File::open(&path).await {
                    Ok(file) => file,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(StoreError::ArchiveMissing(archive_id.clone()).into());
                    }
                    Err(e) => return Err(StoreError::from(e).into()),
                };
                file.seek(SeekFrom::Start(job_range.start() + range.start()))
                    .await
                    .map_err(StoreError::from)?;
                Ok(Box::pin(file.take(range.len())))
            }
            JobAction::Inventory => {
                let inventory = record.inventory.unwrap_or_default();
                let bytes = serde_json::to_vec(&inventory).map_err(StoreError::from)?;
                validate_output_range(job_id, range, bytes.len() as u64)?;

                #[allow(clippy::cast_possible_truncation)]
                let slice = bytes[range.start() as usize..range.end_exclusive() as usize].to_vec();
                Ok(Box::pin(std::io::Cursor::new(slice)))
            }
        }
    }

    async fn submit_catalogue_discovery(&self, vault: &VaultTarget) -> Result<JobId, VaultError> {
        let job_id = self
            .create_job(&vault.name, JobAction::Inventory, None, None)
            .await?;
        Ok(job_id)
    }

    async fn fetch_catalogue_archive(
        &self,
        vault: &VaultTarget,
        job_id: &JobId,
    ) -> Result<ArchiveEntry, VaultError> {
        let record = self.completed_job(&vault.name, job_id).await?;
        if record.action != JobAction::Inventory {
            return Err(StoreError::InvalidRequest(format!("job {job_id} is not an inventory")).into());
        }

        // The newest upload is the current catalogue.
        let newest = record
            .inventory
            .unwrap_or_default()
            .archive_list
            .into_iter()
            .max_by(|a, b| a.creation_date.cmp(&b.creation_date))
            .ok_or_else(|| {
                StoreError::InvalidRequest(format!("vault '{}' holds no archive", vault.name))
            })?;

        Ok(ArchiveEntry::new(newest.archive_id, newest.size))
    }

    async fn retrieval_policy(&self) -> Result<RetrievalPolicy, VaultError> {
        Ok(self.config.policy)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;
    use thaw_core::{VaultPair, VaultRole};
    use tokio::io::AsyncReadExt;

    use super::*;

    fn vault_with(archives: &[(&str, Vec<u8>)]) -> (TempDir, VaultPair) {
        let temp = TempDir::new().unwrap();
        let pair = VaultPair::for_data_vault("photos");
        for target in pair.targets() {
            std::fs::create_dir_all(temp.path().join(&target.name).join("archives")).unwrap();
        }
        for (id, bytes) in archives {
            std::fs::write(
                temp.path().join("photos").join("archives").join(id),
                bytes,
            )
            .unwrap();
        }
        (temp, pair)
    }

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn read_all(mut output: JobOutput) -> Vec<u8> {
        let mut buf = Vec::new();
        output.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_retrieval_roundtrip_through_job_output() {
        let data = patterned(3 * MIB as usize);
        let (temp, pair) = vault_with(&[("A", data.clone())]);
        let vault = DirectoryVault::new(DirectoryVaultConfig::new(temp.path()));

        let range = ByteRange::with_len(MIB, 2 * MIB).unwrap();
        let job = vault
            .submit_retrieval(&pair.data, &ArchiveId::new("A"), range)
            .await
            .unwrap();
        assert_eq!(
            vault.poll_status(&pair.data, &job).await.unwrap(),
            JobStatus::Succeeded
        );

        let sub = ByteRange::with_len(10, 100).unwrap();
        let bytes = read_all(vault.fetch_output(&pair.data, &job, sub).await.unwrap()).await;
        let offset = MIB as usize + 10;
        assert_eq!(bytes, data[offset..offset + 100]);
    }

    #[tokio::test]
    async fn test_misaligned_ranges_are_rejected() {
        let (temp, pair) = vault_with(&[("A", patterned(3 * MIB as usize))]);
        let vault = DirectoryVault::new(DirectoryVaultConfig::new(temp.path()));
        let id = ArchiveId::new("A");

        let unaligned_start = ByteRange::with_len(10, MIB).unwrap();
        assert!(matches!(
            vault.submit_retrieval(&pair.data, &id, unaligned_start).await,
            Err(VaultError::Remote { .. })
        ));

        let short_middle = ByteRange::with_len(0, MIB + 1).unwrap();
        assert!(vault.submit_retrieval(&pair.data, &id, short_middle).await.is_err());

        let final_chunk = ByteRange::with_len(2 * MIB, MIB).unwrap();
        assert!(vault.submit_retrieval(&pair.data, &id, final_chunk).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_archive_is_not_found() {
        let (temp, pair) = vault_with(&[]);
        let vault = DirectoryVault::new(DirectoryVaultConfig::new(temp.path()));
        let result = vault
            .submit_retrieval(&pair.data, &ArchiveId::new("gone"), ByteRange::whole(5).unwrap())
            .await;
        assert!(matches!(result, Err(VaultError::ArchiveNotFound { .. })));
    }

    #[tokio::test]
    async fn test_delayed_jobs_and_rate_limit() {
        let (temp, pair) = vault_with(&[("A", patterned(100))]);
        let vault = DirectoryVault::new(
            DirectoryVaultConfig::new(temp.path())
                .with_job_delay(Duration::from_secs(3600))
                .with_max_in_progress_jobs(Some(1)),
        );
        let id = ArchiveId::new("A");
        let range = ByteRange::whole(100).unwrap();

        let job = vault.submit_retrieval(&pair.data, &id, range).await.unwrap();
        assert_eq!(
            vault.poll_status(&pair.data, &job).await.unwrap(),
            JobStatus::InProgress
        );
        assert!(vault.fetch_output(&pair.data, &job, range).await.is_err());
        assert!(matches!(
            vault.submit_retrieval(&pair.data, &id, range).await,
            Err(VaultError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (temp, pair) = vault_with(&[]);
        let vault = DirectoryVault::new(DirectoryVaultConfig::new(temp.path()));
        assert!(matches!(
            vault.poll_status(&pair.data, &JobId::new("nope")).await,
            Err(VaultError::JobNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_listing_is_paged_and_tagged() {
        let (temp, pair) = vault_with(&[("A", patterned(10))]);
        let vault = DirectoryVault::new(DirectoryVaultConfig::new(temp.path()).with_page_size(2));
        for _ in 0..3 {
            vault
                .submit_retrieval(&pair.data, &ArchiveId::new("A"), ByteRange::whole(10).unwrap())
                .await
                .unwrap();
        }

        let first = vault.list_jobs(&pair.data, None).await.unwrap();
        assert_eq!(first.jobs.len(), 2);
        assert!(first.jobs.iter().all(|j| j.role == VaultRole::Data));
        let second = vault.list_jobs(&pair.data, first.marker).await.unwrap();
        assert_eq!(second.jobs.len(), 1);
        assert!(second.marker.is_none());
    }

    #[tokio::test]
    async fn test_catalogue_discovery_reports_newest_archive() {
        let (temp, pair) = vault_with(&[]);
        std::fs::write(
            temp.path().join("photos_mapping").join("archives").join("CAT"),
            b"sqlite bytes",
        )
        .unwrap();
        let vault = DirectoryVault::new(DirectoryVaultConfig::new(temp.path()));

        let job = vault.submit_catalogue_discovery(&pair.catalogue).await.unwrap();
        let archive = vault
            .fetch_catalogue_archive(&pair.catalogue, &job)
            .await
            .unwrap();
        assert_eq!(archive, ArchiveEntry::new("CAT", 12));

        let listed = vault.list_jobs(&pair.catalogue, None).await.unwrap();
        assert_eq!(listed.jobs[0].action, JobAction::Inventory);
        assert_eq!(listed.jobs[0].role, VaultRole::Catalogue);
    }

    #[tokio::test]
    async fn test_list_vaults() {
        let (temp, _pair) = vault_with(&[]);
        let vault = DirectoryVault::new(DirectoryVaultConfig::new(temp.path()));
        let names = vault.list_vaults().await.unwrap();
        assert_eq!(names, vec!["photos".to_string(), "photos_mapping".to_string()]);
        assert_eq!(
            vault.retrieval_policy().await.unwrap(),
            RetrievalPolicy::FreeTier
        );
    }
}
