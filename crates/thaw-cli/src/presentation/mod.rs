//! Shared CLI presentation utilities.
//!
//! Format-only helpers: tables for the listing commands and the progress
//! display driven by restore events.

pub mod progress;
pub mod tables;

pub use progress::ProgressObserver;
pub use tables::{format_optional, print_separator, truncate_string};
