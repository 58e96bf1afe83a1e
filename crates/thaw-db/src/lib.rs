//! `SQLite` catalogue reader for thaw.
//!
//! The catalogue is a `SQLite` database downloaded from the catalogue vault.
//! Its `file_info_tb` table holds one row per archived file:
//!
//! | column     | meaning                          |
//! |------------|----------------------------------|
//! | `basePath` | path relative to the restore root |
//! | `archiveId`| archive holding the file content  |
//! | `fileSize` | size in bytes                     |
//!
//! [`SqliteCatalogueReader`] implements `CatalogueReaderPort` on top of it and
//! [`SqliteCatalogueSource`] opens downloaded catalogue files.

#![deny(unsafe_code)]

pub mod factory;
mod filters;
pub mod repositories;
pub mod setup;

// Re-export factory for convenient access
pub use factory::SqliteCatalogueSource;

// Re-export repository implementations
pub use repositories::SqliteCatalogueReader;

// Re-export setup functions for convenient access
pub use setup::open_catalogue;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::{insert_catalogue_file, setup_test_catalogue, write_catalogue_file};

#[cfg(test)]
use tokio_test as _;
