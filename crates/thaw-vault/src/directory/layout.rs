//! On-disk layout of a directory vault.
//!
//! ```text
//! <root>/<vault>/archives/<archive id>   archive bytes
//! <root>/<vault>/jobs/<job id>.json      job records
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

const ARCHIVES_DIR: &str = "archives";
const JOBS_DIR: &str = "jobs";

/// One archive as reported by an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InventoryItem {
    pub archive_id: String,
    pub size: u64,
    pub creation_date: DateTime<Utc>,
}

/// Inventory job output document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Inventory {
    pub archive_list: Vec<InventoryItem>,
}

#[derive(Debug, Clone)]
pub(crate) struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of an existing vault.
    pub fn vault_dir(&self, vault: &str) -> StoreResult<PathBuf> {
        check_component(vault)?;
        let dir = self.root.join(vault);
        if !dir.is_dir() {
            return Err(StoreError::VaultMissing(vault.to_string()));
        }
        Ok(dir)
    }

    pub fn archive_path(&self, vault: &str, archive_id: &str) -> StoreResult<PathBuf> {
        check_component(archive_id)?;
        Ok(self.vault_dir(vault)?.join(ARCHIVES_DIR).join(archive_id))
    }

    pub fn jobs_dir(&self, vault: &str) -> StoreResult<PathBuf> {
        Ok(self.vault_dir(vault)?.join(JOBS_DIR))
    }

    pub fn job_path(&self, vault: &str, job_id: &str) -> StoreResult<PathBuf> {
        check_component(job_id)?;
        Ok(self.jobs_dir(vault)?.join(format!("{job_id}.json")))
    }

    /// Every archive currently stored in `vault`.
    pub async fn inventory(&self, vault: &str) -> StoreResult<Inventory> {
        let dir = self.vault_dir(vault)?.join(ARCHIVES_DIR);
        let mut archive_list = Vec::new();
        if !dir.is_dir() {
            return Ok(Inventory { archive_list });
        }

        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let creation_date = metadata
                .modified()
                .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
            archive_list.push(InventoryItem {
                archive_id: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                creation_date,
            });
        }
        archive_list.sort_by(|a, b| {
            a.creation_date
                .cmp(&b.creation_date)
                .then_with(|| a.archive_id.cmp(&b.archive_id))
        });
        Ok(Inventory { archive_list })
    }
}

/// Reject names that would escape the vault directory.
fn check_component(name: &str) -> StoreResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StoreError::InvalidRequest(format!("invalid name '{name}'")));
    }
    Ok(())
}
