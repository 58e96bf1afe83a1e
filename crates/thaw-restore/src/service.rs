//! Restore entry points.
//!
//! [`RestoreService`] owns the ports of one vault pair and runs the stages in
//! order: reconciliation, catalogue fetch, destination preparation, then the
//! engine loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

use thaw_core::{
    CatalogueFile, CatalogueReaderPort, CatalogueSourcePort, JobDescriptor, PathFilters,
    RestoreEvent, RestoreObserver, RestoreResult, RestoreSettings, RetrievalPolicy,
    VaultClientPort, VaultPair, VaultPaths, ensure_private_dir,
};

use crate::cache::RunCache;
use crate::catalogue_fetch::fetch_catalogue;
use crate::context::RunContext;
use crate::destination::prepare_destination;
use crate::engine::{RestoreEngine, RestoreSummary};
use crate::reconcile::{JobIndex, reconcile};
use crate::throughput::ThroughputEstimator;

/// Input of one restore run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory the file tree is restored into.
    pub destination: PathBuf,
    pub filters: PathFilters,
    /// Download the catalogue again even when a local copy exists.
    pub refresh_catalogue: bool,
    /// Keep an existing destination tree instead of wiping it.
    pub keep_files: bool,
    /// Initial throughput estimate.
    pub bytes_per_second: u64,
    pub settings: RestoreSettings,
}

impl RunConfig {
    pub fn new(destination: impl Into<PathBuf>, bytes_per_second: u64) -> Self {
        Self {
            destination: destination.into(),
            filters: PathFilters::all(),
            refresh_catalogue: false,
            keep_files: false,
            bytes_per_second,
            settings: RestoreSettings::default(),
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: PathFilters) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub const fn with_refresh_catalogue(mut self, refresh: bool) -> Self {
        self.refresh_catalogue = refresh;
        self
    }

    #[must_use]
    pub const fn with_keep_files(mut self, keep: bool) -> Self {
        self.keep_files = keep;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RestoreSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Ports and locations a [`RestoreService`] is built from.
pub struct RestoreDeps {
    pub client: Arc<dyn VaultClientPort>,
    pub catalogue_source: Arc<dyn CatalogueSourcePort>,
    pub observer: Arc<dyn RestoreObserver>,
    pub vaults: VaultPair,
    pub paths: VaultPaths,
}

/// Restores one data vault using its catalogue vault.
pub struct RestoreService {
    client: Arc<dyn VaultClientPort>,
    catalogue_source: Arc<dyn CatalogueSourcePort>,
    observer: Arc<dyn RestoreObserver>,
    vaults: VaultPair,
    paths: VaultPaths,
}

impl RestoreService {
    pub fn new(deps: RestoreDeps) -> Self {
        Self {
            client: deps.client,
            catalogue_source: deps.catalogue_source,
            observer: deps.observer,
            vaults: deps.vaults,
            paths: deps.paths,
        }
    }

    pub const fn vaults(&self) -> &VaultPair {
        &self.vaults
    }

    /// Location of the local catalogue copy.
    pub fn catalogue_path(&self) -> PathBuf {
        self.paths.catalogue()
    }

    /// Modification time of the local catalogue, when one exists.
    pub fn catalogue_modified(&self) -> Option<SystemTime> {
        std::fs::metadata(self.paths.catalogue())
            .and_then(|meta| meta.modified())
            .ok()
    }

    fn context<'a>(&'a self, settings: &'a RestoreSettings, cancel: &'a CancellationToken) -> RunContext<'a> {
        RunContext {
            client: self.client.as_ref(),
            observer: self.observer.as_ref(),
            vaults: &self.vaults,
            settings,
            cancel,
        }
    }

    /// Load the run cache and align it with the jobs the vaults still know.
    async fn reconcile(&self) -> RestoreResult<(RunCache, JobIndex)> {
        ensure_private_dir(self.paths.dir())?;
        let mut cache = RunCache::load(self.paths.run_cache())?;
        let mut index = reconcile(self.client.as_ref(), &self.vaults).await?;
        index.sync_cache(&mut cache)?;
        Ok((cache, index))
    }

    /// Download the catalogue when missing or when `refresh` is set.
    ///
    /// Returns the observed download speed when a download happened.
    async fn ensure_catalogue_with(
        &self,
        ctx: RunContext<'_>,
        cache: &mut RunCache,
        refresh: bool,
    ) -> RestoreResult<Option<u64>> {
        let path = self.paths.catalogue();
        if !refresh && path.is_file() {
            tracing::debug!(path = %path.display(), "Using local catalogue");
            return Ok(None);
        }
        fetch_catalogue(ctx, cache, &path).await
    }

    /// Make sure a local catalogue exists, downloading it if needed.
    pub async fn ensure_catalogue(
        &self,
        settings: &RestoreSettings,
        refresh: bool,
        cancel: &CancellationToken,
    ) -> RestoreResult<()> {
        settings.validate()?;
        let (mut cache, _) = self.reconcile().await?;
        self.ensure_catalogue_with(self.context(settings, cancel), &mut cache, refresh)
            .await?;
        Ok(())
    }

    async fn open_catalogue(&self) -> RestoreResult<Arc<dyn CatalogueReaderPort>> {
        Ok(self.catalogue_source.open(&self.paths.catalogue()).await?)
    }

    /// Restore every archive matching the filters into the destination.
    pub async fn restore(
        &self,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> RestoreResult<RestoreSummary> {
        config.settings.validate()?;
        let ctx = self.context(&config.settings, cancel);
        let (mut cache, index) = self.reconcile().await?;

        let mut throughput = ThroughputEstimator::new(
            config.bytes_per_second,
            config.settings.auto_update_speed,
        );
        let measured = self
            .ensure_catalogue_with(ctx, &mut cache, config.refresh_catalogue)
            .await?;
        if let Some(bytes_per_second) = measured.and_then(|bps| throughput.seed(bps)) {
            self.observer
                .emit(RestoreEvent::ThroughputUpdated { bytes_per_second });
        }

        prepare_destination(&config.destination, config.keep_files).await?;
        let catalogue = self.open_catalogue().await?;
        let engine = RestoreEngine::new(
            ctx,
            catalogue.as_ref(),
            &mut cache,
            index,
            config.destination.clone(),
            &config.filters,
            throughput,
        )
        .await?;
        engine.run().await
    }

    /// Catalogue files matching `filters` and the bytes restoring them would retrieve.
    pub async fn list_files(&self, filters: &PathFilters) -> RestoreResult<(Vec<CatalogueFile>, u64)> {
        let catalogue = self.open_catalogue().await?;
        let files = catalogue.list_files(filters).await?.collect_all().await?;
        let total = catalogue.total_size(filters).await?;
        Ok((files, total))
    }

    /// Every job known to both vaults, data vault first.
    pub async fn list_jobs(&self) -> RestoreResult<Vec<JobDescriptor>> {
        let mut jobs = Vec::new();
        for target in self.vaults.targets() {
            let mut marker = None;
            loop {
                let page = self.client.list_jobs(target, marker).await?;
                jobs.extend(page.jobs);
                marker = page.marker;
                if marker.is_none() {
                    break;
                }
            }
        }
        Ok(jobs)
    }

    pub async fn retrieval_policy(&self) -> RestoreResult<RetrievalPolicy> {
        Ok(self.client.retrieval_policy().await?)
    }

    /// Working directory of this vault pair.
    pub fn working_dir(&self) -> &Path {
        self.paths.dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use thaw_core::{CatalogueError, NoopRestoreObserver, JobAction, MIB};

    use crate::test_support::{MockCatalogue, MockVault, content, pair};

    /// Serves one fixed catalogue whenever the local file exists.
    struct FixedSource(Arc<MockCatalogue>);

    #[async_trait]
    impl CatalogueSourcePort for FixedSource {
        async fn open(&self, path: &Path) -> Result<Arc<dyn CatalogueReaderPort>, CatalogueError> {
            if !path.is_file() {
                return Err(CatalogueError::Missing(path.display().to_string()));
            }
            Ok(self.0.clone())
        }
    }

    fn service(temp: &TempDir, vault: Arc<MockVault>, rows: &[(&str, &str, u64)]) -> RestoreService {
        RestoreService::new(RestoreDeps {
            client: vault,
            catalogue_source: Arc::new(FixedSource(Arc::new(MockCatalogue::new(rows)))),
            observer: Arc::new(NoopRestoreObserver),
            vaults: pair(),
            paths: VaultPaths::in_dir(temp.path().join("work")),
        })
    }

    fn quick_settings() -> RestoreSettings {
        RestoreSettings::default()
            .with_poll_interval(std::time::Duration::ZERO)
            .with_rate_limit_cooldown(std::time::Duration::ZERO)
    }

    fn seeded_vault() -> Arc<MockVault> {
        let vault = Arc::new(MockVault::new());
        vault.add_archive("photos_mapping", "CAT", b"catalogue bytes".to_vec());
        vault.set_inventory("photos_mapping", "CAT", 15);
        vault.add_archive("photos", "A", content(1, 2 * MIB + 3));
        vault
    }

    #[tokio::test]
    async fn test_restore_downloads_catalogue_first() {
        let temp = TempDir::new().unwrap();
        let vault = seeded_vault();
        let service = service(&temp, vault.clone(), &[("pics/a.jpg", "A", 2 * MIB + 3)]);
        let config = RunConfig::new(temp.path().join("out"), 10 * MIB)
            .with_settings(quick_settings());

        let summary = service
            .restore(&config, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.archives_restored, 1);
        assert_eq!(vault.discovery_count(), 1);
        assert_eq!(
            std::fs::read(service.catalogue_path()).unwrap(),
            b"catalogue bytes"
        );
        assert_eq!(
            std::fs::read(temp.path().join("out/pics/a.jpg")).unwrap(),
            content(1, 2 * MIB + 3)
        );
        let cache = RunCache::load(temp.path().join("work/cache.json")).unwrap();
        assert!(cache.catalogue_archive().is_none());
        assert_eq!(cache.archive_job_count(), 0);
    }

    #[tokio::test]
    async fn test_local_catalogue_is_reused() {
        let temp = TempDir::new().unwrap();
        let vault = seeded_vault();
        let service = service(&temp, vault.clone(), &[("a", "A", 2 * MIB + 3)]);
        std::fs::create_dir_all(temp.path().join("work")).unwrap();
        std::fs::write(service.catalogue_path(), b"local").unwrap();

        let config = RunConfig::new(temp.path().join("out"), MIB).with_settings(quick_settings());
        service
            .restore(&config, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(vault.discovery_count(), 0);
        assert!(vault.submissions("photos_mapping").is_empty());
        assert!(service.catalogue_modified().is_some());
    }

    #[tokio::test]
    async fn test_cached_discovery_job_is_reused() {
        let temp = TempDir::new().unwrap();
        let vault = seeded_vault();
        let catalogue_vault = pair().catalogue;
        vault.add_existing_job(&catalogue_vault, "inv-earlier", JobAction::Inventory, None);
        let service = service(&temp, vault.clone(), &[("a", "A", 2 * MIB + 3)]);

        service
            .ensure_catalogue(&quick_settings(), false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(vault.discovery_count(), 0);
        assert_eq!(vault.submissions("photos_mapping").len(), 1);
    }

    #[tokio::test]
    async fn test_list_files_and_jobs() {
        let temp = TempDir::new().unwrap();
        let vault = seeded_vault();
        let data_vault = pair().data;
        for i in 0..3 {
            vault.add_existing_job(
                &data_vault,
                &format!("job-{i}"),
                JobAction::ArchiveRetrieval,
                None,
            );
        }
        let service = service(&temp, vault, &[("a/x", "A", 10), ("b/y", "B", 5), ("a/z", "A", 10)]);
        std::fs::create_dir_all(temp.path().join("work")).unwrap();
        std::fs::write(service.catalogue_path(), b"local").unwrap();

        let (files, total) = service
            .list_files(&PathFilters::new(["a/*"]))
            .await
            .unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(total, 10);

        let jobs = service.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_settings_are_rejected() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp, seeded_vault(), &[]);
        let config = RunConfig::new(temp.path().join("out"), MIB)
            .with_settings(RestoreSettings::default().with_max_queued_jobs(0));
        let result = service.restore(&config, &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(thaw_core::RestoreError::InvalidSettings(_))
        ));
    }

    #[tokio::test]
    async fn test_catalogue_fetch_rejects_invalid_settings() {
        let temp = TempDir::new().unwrap();
        let vault = seeded_vault();
        let service = service(&temp, vault.clone(), &[]);
        let settings = RestoreSettings::default().with_max_queued_jobs(0);

        let result = service
            .ensure_catalogue(&settings, true, &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(thaw_core::RestoreError::InvalidSettings(_))
        ));
        assert_eq!(vault.call_count(), 0);
    }
}
