//! Path utilities for thaw data directories.
//!
//! Every vault gets a private working directory under the data root:
//!
//! ```text
//! <data_root>/<region>/<vault>/
//!     cache.json         run cache, catalogue entries
//!     cache.log          run cache, archive job log
//!     catalogue.sqlite   downloaded catalogue
//! ```
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - adapters handle user prompts separately

mod ensure;
mod error;
mod platform;
mod vault;

// Error type
pub use error::PathError;

// Platform detection and roots
pub use platform::{DATA_DIR_ENV, data_root, resolve_data_root};

// Per-vault layout
pub use vault::VaultPaths;

// Directory operations
pub use ensure::ensure_private_dir;
