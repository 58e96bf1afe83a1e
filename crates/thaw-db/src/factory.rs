//! Catalogue source: opens downloaded catalogue files as readers.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thaw_core::{CatalogueError, CatalogueReaderPort, CatalogueSourcePort};

use crate::repositories::SqliteCatalogueReader;
use crate::setup::open_catalogue;

/// Opens catalogue files with [`open_catalogue`] and wraps them in a
/// [`SqliteCatalogueReader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteCatalogueSource;

impl SqliteCatalogueSource {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CatalogueSourcePort for SqliteCatalogueSource {
    async fn open(&self, path: &Path) -> Result<Arc<dyn CatalogueReaderPort>, CatalogueError> {
        if !path.is_file() {
            return Err(CatalogueError::Missing(path.display().to_string()));
        }
        let pool = open_catalogue(path)
            .await
            .map_err(|e| CatalogueError::Storage(format!("{e:#}")))?;
        Ok(Arc::new(SqliteCatalogueReader::new(pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::write_catalogue_file;
    use tempfile::TempDir;
    use thaw_core::PathFilters;

    #[tokio::test]
    async fn test_open_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalogue.sqlite");
        write_catalogue_file(&path, &[("a", "A", 7)]).await.unwrap();

        let reader = SqliteCatalogueSource::new().open(&path).await.unwrap();
        assert_eq!(reader.total_size(&PathFilters::all()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = SqliteCatalogueSource::new()
            .open(&temp.path().join("absent.sqlite"))
            .await;
        assert!(matches!(result, Err(CatalogueError::Missing(_))));
    }
}
