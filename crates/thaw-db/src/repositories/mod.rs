//! `SQLite` implementations of the catalogue port.

mod sqlite_catalogue_reader;

pub use sqlite_catalogue_reader::SqliteCatalogueReader;
