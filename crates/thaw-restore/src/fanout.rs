//! Destination paths and dedup fan-out.
//!
//! Every archive is downloaded once into a staging file. When it is complete
//! the staging file is copied to every destination path but the last and
//! renamed onto the last.

use std::path::{Component, Path, PathBuf};

use thaw_core::{ArchiveId, RestoreError, RestoreResult, ensure_private_dir};

/// Directory under the destination holding partially downloaded archives.
pub const STAGING_DIR: &str = ".thaw-staging";

/// Map a catalogue path onto the destination tree.
///
/// Absolute catalogue paths are re-rooted under `root`. Paths escaping the
/// tree through `..` yield `None`.
pub fn resolve_destination(root: &Path, catalogue_path: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    let mut pushed = false;
    for component in Path::new(catalogue_path).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                pushed = true;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    pushed.then_some(resolved)
}

/// Staging file of `archive_id` under `destination`.
pub fn staging_path(destination: &Path, archive_id: &ArchiveId) -> PathBuf {
    let name: String = archive_id
        .as_str()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    destination.join(STAGING_DIR).join(name)
}

/// Length of the file at `path`, or `None` when it does not exist.
pub async fn existing_len(path: &Path) -> RestoreResult<Option<u64>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RestoreError::io(path, e)),
    }
}

/// A destination already holds the archive when its length matches.
pub async fn is_present(path: &Path, size: u64) -> RestoreResult<bool> {
    Ok(existing_len(path).await? == Some(size))
}

fn ensure_parent(path: &Path) -> RestoreResult<()> {
    if let Some(parent) = path.parent() {
        ensure_private_dir(parent)?;
    }
    Ok(())
}

/// Copy `source` to `target` through a sibling temp name.
async fn copy_into_place(source: &Path, target: &Path) -> RestoreResult<()> {
    ensure_parent(target)?;
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".thaw-part");
    let tmp = PathBuf::from(tmp);
    tokio::fs::copy(source, &tmp)
        .await
        .map_err(|e| RestoreError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, target)
        .await
        .map_err(|e| RestoreError::io(target, e))
}

async fn move_into_place(source: &Path, target: &Path) -> RestoreResult<()> {
    ensure_parent(target)?;
    tokio::fs::rename(source, target)
        .await
        .map_err(|e| RestoreError::io(target, e))
}

/// Materialize a complete staging file at every target.
///
/// Targets already holding `size` bytes are left alone. The staging file is
/// consumed: renamed onto the last target, or removed when nothing needs it.
pub async fn fan_out(staging: &Path, targets: &[PathBuf], size: u64) -> RestoreResult<()> {
    let mut missing = Vec::with_capacity(targets.len());
    for target in targets {
        if !is_present(target, size).await? {
            missing.push(target);
        }
    }

    let Some((last, rest)) = missing.split_last() else {
        tokio::fs::remove_file(staging)
            .await
            .map_err(|e| RestoreError::io(staging, e))?;
        return Ok(());
    };
    for target in rest {
        copy_into_place(staging, target).await?;
    }
    move_into_place(staging, last).await?;
    tracing::debug!(staging = %staging.display(), targets = targets.len(), "Fanned out archive");
    Ok(())
}

/// Fill the targets not yet holding `size` bytes from one that does.
///
/// Returns false when no target is complete.
pub async fn copy_from_present(targets: &[PathBuf], size: u64) -> RestoreResult<bool> {
    let mut seed = None;
    let mut missing = Vec::new();
    for target in targets {
        if is_present(target, size).await? {
            seed.get_or_insert(target);
        } else {
            missing.push(target);
        }
    }
    let Some(seed) = seed else {
        return Ok(false);
    };
    for target in missing {
        copy_into_place(seed, target).await?;
    }
    Ok(true)
}

/// Cut a staging file holding more than `size` bytes.
pub async fn truncate_to(path: &Path, size: u64) -> RestoreResult<()> {
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| RestoreError::io(path, e))?;
    file.set_len(size)
        .await
        .map_err(|e| RestoreError::io(path, e))
}

/// Create every target as an empty file.
pub async fn create_empty_files(targets: &[PathBuf]) -> RestoreResult<()> {
    for target in targets {
        ensure_parent(target)?;
        tokio::fs::File::create(target)
            .await
            .map_err(|e| RestoreError::io(target, e))?;
    }
    Ok(())
}

/// Remove the staging directory once nothing is left in it.
pub async fn remove_staging_dir(destination: &Path) -> RestoreResult<()> {
    let dir = destination.join(STAGING_DIR);
    match tokio::fs::remove_dir(&dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        // Left-over partial downloads keep the directory alive.
        Err(e) if e.kind() == std::io::ErrorKind::DirectoryNotEmpty => Ok(()),
        Err(e) => Err(RestoreError::io(&dir, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_destination() {
        let root = Path::new("/restore");
        assert_eq!(
            resolve_destination(root, "/home/me/a.txt"),
            Some(PathBuf::from("/restore/home/me/a.txt"))
        );
        assert_eq!(
            resolve_destination(root, "./docs/b.txt"),
            Some(PathBuf::from("/restore/docs/b.txt"))
        );
        assert_eq!(resolve_destination(root, "../etc/passwd"), None);
        assert_eq!(resolve_destination(root, "/"), None);
    }

    #[test]
    fn test_staging_path_sanitizes_id() {
        let path = staging_path(Path::new("/d"), &ArchiveId::new("a/b\\c"));
        assert_eq!(path, PathBuf::from("/d/.thaw-staging/a_b_c"));
    }

    #[tokio::test]
    async fn test_fan_out_copies_then_renames() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        std::fs::write(&staging, b"payload").unwrap();
        let targets = vec![temp.path().join("x/one"), temp.path().join("y/two")];

        fan_out(&staging, &targets, 7).await.unwrap();

        assert_eq!(std::fs::read(&targets[0]).unwrap(), b"payload");
        assert_eq!(std::fs::read(&targets[1]).unwrap(), b"payload");
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn test_fan_out_skips_present_targets() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        std::fs::write(&staging, b"new").unwrap();
        let kept = temp.path().join("kept");
        std::fs::write(&kept, b"old").unwrap();

        fan_out(&staging, std::slice::from_ref(&kept), 3).await.unwrap();

        assert_eq!(std::fs::read(&kept).unwrap(), b"old");
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn test_copy_from_present_seed() {
        let temp = TempDir::new().unwrap();
        let seed = temp.path().join("seed");
        std::fs::write(&seed, b"abcd").unwrap();
        let short = temp.path().join("short");
        std::fs::write(&short, b"ab").unwrap();
        let targets = vec![short.clone(), seed, temp.path().join("new/file")];

        assert!(copy_from_present(&targets, 4).await.unwrap());
        assert_eq!(std::fs::read(&short).unwrap(), b"abcd");
        assert_eq!(std::fs::read(&targets[2]).unwrap(), b"abcd");

        let none = vec![temp.path().join("absent")];
        assert!(!copy_from_present(&none, 4).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_empty_files() {
        let temp = TempDir::new().unwrap();
        let targets = vec![temp.path().join("a/empty"), temp.path().join("b")];
        create_empty_files(&targets).await.unwrap();
        for target in &targets {
            assert_eq!(std::fs::metadata(target).unwrap().len(), 0);
        }
    }

    #[tokio::test]
    async fn test_remove_staging_dir_keeps_partials() {
        let temp = TempDir::new().unwrap();
        remove_staging_dir(temp.path()).await.unwrap();

        let dir = temp.path().join(STAGING_DIR);
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("partial"), b"x").unwrap();
        remove_staging_dir(temp.path()).await.unwrap();
        assert!(dir.exists());

        std::fs::remove_file(dir.join("partial")).unwrap();
        remove_staging_dir(temp.path()).await.unwrap();
        assert!(!dir.exists());
    }
}
