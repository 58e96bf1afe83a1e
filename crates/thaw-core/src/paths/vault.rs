//! Per-vault working directory layout.

use std::path::{Path, PathBuf};

use super::error::PathError;

const RUN_CACHE_FILE: &str = "cache.json";
const CATALOGUE_FILE: &str = "catalogue.sqlite";

/// Location of the state thaw keeps for one vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    dir: PathBuf,
}

impl VaultPaths {
    /// `<root>/<region>/<vault>`.
    pub fn new(root: impl AsRef<Path>, region: &str, vault: &str) -> Result<Self, PathError> {
        if region.trim().is_empty() {
            return Err(PathError::EmptyComponent("region"));
        }
        if vault.trim().is_empty() {
            return Err(PathError::EmptyComponent("vault"));
        }
        Ok(Self {
            dir: root.as_ref().join(region).join(vault),
        })
    }

    /// Use `dir` directly as the working directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn run_cache(&self) -> PathBuf {
        self.dir.join(RUN_CACHE_FILE)
    }

    #[must_use]
    pub fn catalogue(&self) -> PathBuf {
        self.dir.join(CATALOGUE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = VaultPaths::new("/data", "eu-west-1", "photos").unwrap();
        assert_eq!(paths.dir(), Path::new("/data/eu-west-1/photos"));
        assert_eq!(paths.run_cache(), PathBuf::from("/data/eu-west-1/photos/cache.json"));
        assert_eq!(
            paths.catalogue(),
            PathBuf::from("/data/eu-west-1/photos/catalogue.sqlite")
        );
    }

    #[test]
    fn test_rejects_empty_components() {
        assert!(matches!(
            VaultPaths::new("/data", "", "photos"),
            Err(PathError::EmptyComponent("region"))
        ));
        assert!(matches!(
            VaultPaths::new("/data", "us-east-1", " "),
            Err(PathError::EmptyComponent("vault"))
        ));
    }
}
