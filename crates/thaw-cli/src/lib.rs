//! Command-line front end for thaw.
//!
//! Parses flags and `THAW_*` environment variables, asks the questions a
//! restore needs answered (vault, destination, keep or wipe, catalogue
//! refresh, download speed), composes the adapters in [`bootstrap`] and
//! renders progress while the restore service runs.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

#[cfg(test)]
use tokio_test as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod utils;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::{CliError, exit_code_for};
pub use parser::Cli;
