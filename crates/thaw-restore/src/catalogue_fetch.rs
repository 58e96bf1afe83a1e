//! Catalogue download.
//!
//! The catalogue is itself an archive in the catalogue vault. Finding it takes
//! an inventory job and reading it takes a retrieval job, each lasting hours,
//! so both job ids and the archive id are kept in the run cache until the
//! catalogue file is on disk.

use std::path::Path;
use std::time::Instant;

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use thaw_core::{
    ArchiveEntry, ByteRange, CatalogueError, RestoreError, RestoreEvent, RestorePhase,
    RestoreResult, VaultError,
};

use crate::cache::RunCache;
use crate::context::RunContext;
use crate::polling::{submit_with_cooldown, until_cancelled};
use crate::throughput::PassTimer;

/// Download the catalogue to `target`, atomically replacing any previous copy.
///
/// Returns the download speed observed in bytes per second.
pub async fn fetch_catalogue(
    ctx: RunContext<'_>,
    cache: &mut RunCache,
    target: &Path,
) -> RestoreResult<Option<u64>> {
    ctx.observer.emit(RestoreEvent::PhaseChanged {
        phase: RestorePhase::Catalogue,
    });

    let archive = resolve_catalogue_archive(ctx, cache).await?;
    let range = ByteRange::whole(archive.size).ok_or_else(|| {
        CatalogueError::Missing(format!("catalogue archive {} is empty", archive.archive_id))
    })?;
    let client = ctx.client;
    let vault = &ctx.vaults.catalogue;
    let archive_id = &archive.archive_id;

    let job_id = loop {
        let (job_id, fresh) = match cache.catalogue_retrieval_job().cloned() {
            Some(job_id) => {
                tracing::info!(%job_id, "Catalogue retrieval job is in progress");
                (job_id, false)
            }
            None => {
                let job_id = submit_with_cooldown(ctx.settings.rate_limit_cooldown, ctx.cancel, move || {
                    client.submit_retrieval(vault, archive_id, range)
                })
                .await?;
                tracing::info!(%job_id, %archive_id, "Started catalogue retrieval job");
                cache.set_catalogue_retrieval_job(Some(job_id.clone()))?;
                (job_id, true)
            }
        };
        if ctx.wait_unless_expired(vault, &job_id).await? {
            break job_id;
        }
        if fresh {
            return Err(VaultError::job_not_found(job_id.as_str()).into());
        }
        tracing::warn!(%job_id, "Cached catalogue retrieval job was not found, resubmitting");
        cache.set_catalogue_retrieval_job(None)?;
    };

    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir).map_err(|e| RestoreError::io(dir, e))?;
    let mut file = tokio::fs::File::from_std(tmp.reopen().map_err(|e| RestoreError::io(tmp.path(), e))?);

    let started = Instant::now();
    let mut output = client.fetch_output(vault, &job_id, range).await?;
    let received = until_cancelled(ctx.cancel, tokio::io::copy(&mut output, &mut file))
        .await?
        .map_err(|e| RestoreError::io(tmp.path(), e))?;
    file.flush()
        .await
        .map_err(|e| RestoreError::io(tmp.path(), e))?;
    file.sync_all()
        .await
        .map_err(|e| RestoreError::io(tmp.path(), e))?;
    let mut timer = PassTimer::default();
    timer.record(received, started.elapsed());
    drop(file);

    if received != range.len() {
        return Err(RestoreError::TruncatedOutput {
            job_id,
            expected: range.len(),
            received,
        });
    }
    tmp.persist(target)
        .map_err(|e| RestoreError::io(target, e.error))?;
    cache.clear_catalogue()?;

    tracing::info!(
        path = %target.display(),
        bytes = received,
        bytes_per_second = timer.rate(),
        "Catalogue downloaded"
    );
    Ok(timer.rate())
}

/// Archive id and size of the catalogue, from the cache or an inventory job.
async fn resolve_catalogue_archive(
    ctx: RunContext<'_>,
    cache: &mut RunCache,
) -> RestoreResult<ArchiveEntry> {
    if let Some(archive) = cache.catalogue_archive() {
        tracing::debug!(archive_id = %archive.archive_id, "Catalogue archive id is cached");
        return Ok(archive.clone());
    }

    let client = ctx.client;
    let vault = &ctx.vaults.catalogue;
    loop {
        let (job_id, fresh) = match cache.catalogue_discovery_job().cloned() {
            Some(job_id) => {
                tracing::info!(%job_id, "Catalogue discovery job is in progress");
                (job_id, false)
            }
            None => {
                let job_id = submit_with_cooldown(ctx.settings.rate_limit_cooldown, ctx.cancel, move || {
                    client.submit_catalogue_discovery(vault)
                })
                .await?;
                tracing::info!(%job_id, vault = %vault.name, "Started catalogue discovery job");
                cache.set_catalogue_discovery_job(Some(job_id.clone()))?;
                (job_id, true)
            }
        };

        if ctx.wait_unless_expired(vault, &job_id).await? {
            let archive = ctx.client.fetch_catalogue_archive(vault, &job_id).await?;
            tracing::info!(archive_id = %archive.archive_id, size = archive.size, "Found catalogue archive");
            cache.set_catalogue_archive(archive.clone())?;
            return Ok(archive);
        }
        if fresh {
            return Err(VaultError::job_not_found(job_id.as_str()).into());
        }
        tracing::warn!(%job_id, "Cached catalogue discovery job was not found, resubmitting");
        cache.set_catalogue_discovery_job(None)?;
    }
}
