//! Catalogue reader port.
//!
//! The catalogue maps every restored file path to the archive that holds its
//! content. It is read-only for the whole run.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::CatalogueError;
use crate::restore::{ArchiveEntry, ArchiveId, CatalogueFile, PathFilters};

/// Lazy sequence of catalogue rows.
///
/// Readers produce rows on a background task; the engine pulls them one at a
/// time so arbitrarily large catalogues are never held in memory.
pub struct CatalogueCursor<T> {
    rx: mpsc::Receiver<Result<T, CatalogueError>>,
}

impl<T> CatalogueCursor<T> {
    /// Wrap the receiving half of a producer channel.
    pub const fn new(rx: mpsc::Receiver<Result<T, CatalogueError>>) -> Self {
        Self { rx }
    }

    /// Cursor over an in-memory list.
    pub fn from_vec(items: Vec<T>) -> Self {
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // Capacity equals the item count, so this never fails.
            let _ = tx.try_send(Ok(item));
        }
        Self { rx }
    }

    /// Next row, or `None` once the sequence is exhausted.
    pub async fn next(&mut self) -> Option<Result<T, CatalogueError>> {
        self.rx.recv().await
    }

    /// Drain the remaining rows.
    pub async fn collect_all(mut self) -> Result<Vec<T>, CatalogueError> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }
}

/// Port for reading the restore catalogue.
#[async_trait]
pub trait CatalogueReaderPort: Send + Sync {
    /// Distinct archives having at least one path matching `filters`,
    /// ordered by first insertion.
    async fn iterate_archives(
        &self,
        filters: &PathFilters,
    ) -> Result<CatalogueCursor<ArchiveEntry>, CatalogueError>;

    /// Every destination path of an archive, in insertion order.
    async fn paths_for_archive(&self, archive_id: &ArchiveId) -> Result<Vec<String>, CatalogueError>;

    /// Bytes to retrieve for `filters`; every archive is counted once.
    async fn total_size(&self, filters: &PathFilters) -> Result<u64, CatalogueError>;

    /// Every file matching `filters`, in insertion order.
    async fn list_files(
        &self,
        filters: &PathFilters,
    ) -> Result<CatalogueCursor<CatalogueFile>, CatalogueError>;
}

/// Port for opening a downloaded catalogue file.
#[async_trait]
pub trait CatalogueSourcePort: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Arc<dyn CatalogueReaderPort>, CatalogueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cursor_from_vec_yields_in_order() {
        let mut cursor = CatalogueCursor::from_vec(vec![1, 2, 3]);
        assert_eq!(cursor.next().await.unwrap().unwrap(), 1);
        let rest = cursor.collect_all().await.unwrap();
        assert_eq!(rest, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_empty_cursor() {
        let mut cursor: CatalogueCursor<u8> = CatalogueCursor::from_vec(Vec::new());
        assert!(cursor.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cursor_surfaces_errors() {
        let (tx, rx) = mpsc::channel(2);
        tx.send(Ok(7_u8)).await.unwrap();
        tx.send(Err(CatalogueError::Storage("disk".into())))
            .await
            .unwrap();
        drop(tx);
        let cursor = CatalogueCursor::new(rx);
        assert!(cursor.collect_all().await.is_err());
    }
}
