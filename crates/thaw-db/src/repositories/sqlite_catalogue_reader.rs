//! `SQLite` implementation of the `CatalogueReaderPort` trait.

use async_trait::async_trait;
use futures_util::StreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::sync::mpsc;

use thaw_core::{
    ArchiveEntry, ArchiveId, CatalogueCursor, CatalogueError, CatalogueFile, CatalogueReaderPort,
    PathFilters,
};

use crate::filters::where_clause;

/// Rows buffered ahead of the consumer by a cursor task.
const CURSOR_BUFFER: usize = 256;

/// `SQLite` implementation of the `CatalogueReaderPort` trait.
///
/// Archive and file listings are streamed from a background task, so the
/// pool must have a second connection available for per-archive lookups.
pub struct SqliteCatalogueReader {
    pool: SqlitePool,
}

impl SqliteCatalogueReader {
    /// Create a new `SQLite` catalogue reader.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn spawn_cursor<T, F>(&self, sql: String, binds: Vec<String>, map: F) -> CatalogueCursor<T>
    where
        T: Send + 'static,
        F: Fn(&SqliteRow) -> Result<T, CatalogueError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let (tx, rx) = mpsc::channel(CURSOR_BUFFER);

        tokio::spawn(async move {
            let mut query = sqlx::query(&sql);
            for bind in &binds {
                query = query.bind(bind.as_str());
            }

            let mut rows = query.fetch(&pool);
            while let Some(row) = rows.next().await {
                let item = row.map_err(storage).and_then(|row| map(&row));
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });

        CatalogueCursor::new(rx)
    }
}

fn storage(e: sqlx::Error) -> CatalogueError {
    CatalogueError::Storage(e.to_string())
}

fn size_column(row: &SqliteRow, index: usize) -> Result<u64, CatalogueError> {
    let raw: i64 = row.try_get(index).map_err(storage)?;
    u64::try_from(raw).map_err(|_| CatalogueError::Storage(format!("negative file size {raw}")))
}

fn archive_entry(row: &SqliteRow) -> Result<ArchiveEntry, CatalogueError> {
    let archive_id: String = row.try_get(0).map_err(storage)?;
    Ok(ArchiveEntry::new(archive_id, size_column(row, 1)?))
}

fn catalogue_file(row: &SqliteRow) -> Result<CatalogueFile, CatalogueError> {
    Ok(CatalogueFile {
        path: row.try_get(0).map_err(storage)?,
        archive_id: ArchiveId::new(row.try_get::<String, _>(1).map_err(storage)?),
        size: size_column(row, 2)?,
    })
}

#[async_trait]
impl CatalogueReaderPort for SqliteCatalogueReader {
    async fn iterate_archives(
        &self,
        filters: &PathFilters,
    ) -> Result<CatalogueCursor<ArchiveEntry>, CatalogueError> {
        let (clause, binds) = where_clause(filters);
        let sql = format!(
            "SELECT archiveId, MAX(fileSize) FROM file_info_tb {clause} \
             GROUP BY archiveId ORDER BY MIN(rowid)"
        );
        Ok(self.spawn_cursor(sql, binds, archive_entry))
    }

    async fn paths_for_archive(&self, archive_id: &ArchiveId) -> Result<Vec<String>, CatalogueError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT basePath FROM file_info_tb WHERE archiveId = ? \
             GROUP BY basePath ORDER BY MIN(rowid)",
        )
        .bind(archive_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.into_iter().map(|(path,)| path).collect())
    }

    async fn total_size(&self, filters: &PathFilters) -> Result<u64, CatalogueError> {
        let (clause, binds) = where_clause(filters);
        let sql = format!(
            "SELECT COALESCE(SUM(size), 0) FROM \
             (SELECT MAX(fileSize) AS size FROM file_info_tb {clause} GROUP BY archiveId)"
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let total = query.fetch_one(&self.pool).await.map_err(storage)?;

        u64::try_from(total).map_err(|_| CatalogueError::Storage(format!("negative total {total}")))
    }

    async fn list_files(
        &self,
        filters: &PathFilters,
    ) -> Result<CatalogueCursor<CatalogueFile>, CatalogueError> {
        let (clause, binds) = where_clause(filters);
        let sql = format!(
            "SELECT basePath, archiveId, fileSize FROM file_info_tb {clause} ORDER BY rowid"
        );
        Ok(self.spawn_cursor(sql, binds, catalogue_file))
    }
}
