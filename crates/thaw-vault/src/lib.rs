//! Vault client adapters for thaw.
//!
//! - [`DirectoryVault`] implements `VaultClientPort` over a local directory
//!   tree laid out like a cold-storage account, with delayed job readiness,
//!   retention, range validation and optional rate limiting.
//! - [`HttpSpeedProbe`] implements `SpeedProbePort` by timing an HTTP download.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod config;
mod directory;
mod error;
mod speed_probe;

// ============================================================================
// Public API
// ============================================================================

// Clients
pub use directory::DirectoryVault;
pub use speed_probe::HttpSpeedProbe;

// Configuration
pub use config::{DirectoryVaultConfig, SpeedProbeConfig};

// Silence unused dev-dependency warnings
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
