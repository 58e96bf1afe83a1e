//! Job records of a directory vault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thaw_core::{ArchiveId, ByteRange, JobAction, JobDescriptor, JobId, JobStatus, VaultRole};

use super::layout::{Inventory, Layout};
use crate::error::{StoreError, StoreResult};

/// A submitted job as persisted in `jobs/<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JobRecord {
    pub id: String,
    pub action: JobAction,
    pub archive_id: Option<String>,
    pub range: Option<ByteRange>,
    pub created_at: DateTime<Utc>,
    pub ready_at: DateTime<Utc>,
    /// Snapshot taken when an inventory job is submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Inventory>,
}

impl JobRecord {
    pub fn status(&self, now: DateTime<Utc>) -> JobStatus {
        if now >= self.ready_at {
            JobStatus::Succeeded
        } else {
            JobStatus::InProgress
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        now >= self.created_at + retention
    }

    pub fn descriptor(&self, role: VaultRole, now: DateTime<Utc>) -> JobDescriptor {
        JobDescriptor {
            id: JobId::new(self.id.clone()),
            role,
            action: self.action,
            status: self.status(now),
            archive_id: self.archive_id.clone().map(ArchiveId::from),
            byte_range: self.range,
            created_at: Some(self.created_at),
        }
    }
}

/// Job persistence over a [`Layout`].
pub(crate) struct JobStore<'a> {
    layout: &'a Layout,
    retention: chrono::Duration,
}

impl<'a> JobStore<'a> {
    pub const fn new(layout: &'a Layout, retention: chrono::Duration) -> Self {
        Self { layout, retention }
    }

    pub async fn save(&self, vault: &str, record: &JobRecord) -> StoreResult<()> {
        let path = self.layout.job_path(vault, &record.id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(record)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Load a live job; expired and unknown jobs are both "not found".
    pub async fn load(&self, vault: &str, job_id: &str, now: DateTime<Utc>) -> StoreResult<JobRecord> {
        let path = self.layout.job_path(vault, job_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::JobMissing(job_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let record: JobRecord = serde_json::from_slice(&bytes)?;
        if record.is_expired(now, self.retention) {
            return Err(StoreError::JobMissing(job_id.to_string()));
        }
        Ok(record)
    }

    /// Every live job of `vault`, oldest first.
    pub async fn list(&self, vault: &str, now: DateTime<Utc>) -> StoreResult<Vec<JobRecord>> {
        let dir = self.layout.jobs_dir(vault)?;
        let mut records = Vec::new();
        if !dir.is_dir() {
            return Ok(records);
        }

        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let record: JobRecord = serde_json::from_slice(&tokio::fs::read(&path).await?)?;
            if !record.is_expired(now, self.retention) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(created_at: DateTime<Utc>, delay: Duration) -> JobRecord {
        JobRecord {
            id: "job-1".to_string(),
            action: JobAction::ArchiveRetrieval,
            archive_id: Some("A".to_string()),
            range: ByteRange::with_len(0, 10),
            created_at,
            ready_at: created_at + delay,
            inventory: None,
        }
    }

    #[test]
    fn test_status_follows_ready_time() {
        let now = Utc::now();
        let job = record(now, Duration::hours(3));
        assert_eq!(job.status(now), JobStatus::InProgress);
        assert_eq!(job.status(now + Duration::hours(3)), JobStatus::Succeeded);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let job = record(now, Duration::zero());
        assert!(!job.is_expired(now, Duration::hours(24)));
        assert!(job.is_expired(now + Duration::hours(24), Duration::hours(24)));
    }

    #[test]
    fn test_descriptor_carries_role() {
        let now = Utc::now();
        let descriptor = record(now, Duration::zero()).descriptor(VaultRole::Data, now);
        assert_eq!(descriptor.role, VaultRole::Data);
        assert_eq!(descriptor.status, JobStatus::Succeeded);
        assert_eq!(descriptor.archive_id, Some(ArchiveId::new("A")));
    }
}
