//! Directory creation.

use std::fs;
use std::path::Path;

use super::error::PathError;

/// Ensure `path` exists as a directory, creating it and its parents if missing.
///
/// Newly created directories are private to the user (mode 0700 on unix).
pub fn ensure_private_dir(path: &Path) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    tracing::debug!(path = %path.display(), "Created directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a").join("b");
        ensure_private_dir(&target).unwrap();
        assert!(target.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_existing_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ensure_private_dir(&file),
            Err(PathError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_existing_dir_is_accepted() {
        let temp = TempDir::new().unwrap();
        assert!(ensure_private_dir(temp.path()).is_ok());
    }
}
