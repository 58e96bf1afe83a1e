//! Destination directory preparation.

use std::path::Path;

use thaw_core::{RestoreError, RestoreResult, ensure_private_dir};

/// Make `destination` an existing private directory.
///
/// An existing tree is wiped unless `keep_files` is set. Kept files are
/// what lets an interrupted restore resume in place.
pub async fn prepare_destination(destination: &Path, keep_files: bool) -> RestoreResult<()> {
    match tokio::fs::metadata(destination).await {
        Ok(meta) if !meta.is_dir() => {
            return Err(RestoreError::DestinationIsFile(destination.to_path_buf()));
        }
        Ok(_) if !keep_files => {
            tracing::warn!(destination = %destination.display(), "Wiping existing destination");
            tokio::fs::remove_dir_all(destination)
                .await
                .map_err(|e| RestoreError::io(destination, e))?;
        }
        Ok(_) => {
            tracing::info!(destination = %destination.display(), "Keeping existing files");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(RestoreError::io(destination, e)),
    }
    ensure_private_dir(destination)?;
    Ok(())
}
