//! Catalogue database opening and test fixtures.
//!
//! The catalogue file is produced by the backup tool that filled the vault;
//! thaw only reads it, apart from adding a lookup index on first open.

use anyhow::{Context, Result, bail};
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};
use std::path::Path;

/// Opens a downloaded catalogue and makes sure per-archive lookups are indexed.
///
/// # Errors
///
/// Returns an error if:
/// - The catalogue file does not exist
/// - The file is not a `SQLite` database with a `file_info_tb` table
///
/// # Example
///
/// ```rust,no_run
/// use thaw_db::open_catalogue;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = open_catalogue(Path::new("/data/eu-west-1/photos/catalogue.sqlite")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn open_catalogue(path: &Path) -> Result<SqlitePool> {
    if !path.is_file() {
        bail!("catalogue {} does not exist", path.display());
    }

    let pool = SqlitePool::connect_with(SqliteConnectOptions::new().filename(path))
        .await
        .with_context(|| format!("failed to open catalogue {}", path.display()))?;

    ensure_lookup_index(&pool)
        .await
        .with_context(|| format!("{} is not a valid catalogue", path.display()))?;

    tracing::debug!(path = %path.display(), "Opened catalogue");
    Ok(pool)
}

/// Index on `archiveId`; the table ships without one.
async fn ensure_lookup_index(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_info_archive ON file_info_tb(archiveId)")
        .execute(pool)
        .await?;
    Ok(())
}

/// Creates the catalogue table.
///
/// It is safe to call multiple times as all operations use IF NOT EXISTS.
#[cfg(any(test, feature = "test-utils"))]
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS file_info_tb (
            key INTEGER PRIMARY KEY AUTOINCREMENT,
            basePath TEXT NOT NULL,
            archiveId TEXT NOT NULL,
            fileSize INTEGER NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;
    ensure_lookup_index(pool).await
}

/// Sets up an in-memory catalogue for testing.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_catalogue() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Inserts one catalogue row.
#[cfg(any(test, feature = "test-utils"))]
pub async fn insert_catalogue_file(
    pool: &SqlitePool,
    path: &str,
    archive_id: &str,
    size: u64,
) -> Result<()> {
    sqlx::query("INSERT INTO file_info_tb (basePath, archiveId, fileSize) VALUES (?, ?, ?)")
        .bind(path)
        .bind(archive_id)
        .bind(i64::try_from(size)?)
        .execute(pool)
        .await?;
    Ok(())
}

/// Writes a catalogue database file holding `rows` of `(path, archive_id, size)`.
#[cfg(any(test, feature = "test-utils"))]
pub async fn write_catalogue_file(path: &Path, rows: &[(&str, &str, u64)]) -> Result<()> {
    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true),
    )
    .await?;
    create_schema(&pool).await?;
    for (file, archive_id, size) in rows {
        insert_catalogue_file(&pool, file, archive_id, *size).await?;
    }
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_setup_test_catalogue() {
        let pool = setup_test_catalogue().await.unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM file_info_tb")
            .fetch_one(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_open_written_catalogue() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalogue.sqlite");
        write_catalogue_file(&path, &[("a.txt", "A", 3), ("b.txt", "B", 4)])
            .await
            .unwrap();

        let pool = open_catalogue(&path).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM file_info_tb")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_open_missing_catalogue_fails() {
        let temp = TempDir::new().unwrap();
        let result = open_catalogue(&temp.path().join("nope.sqlite")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_non_catalogue_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("garbage.sqlite");
        std::fs::write(&path, b"not a database at all, just bytes").unwrap();
        assert!(open_catalogue(&path).await.is_err());
    }
}
