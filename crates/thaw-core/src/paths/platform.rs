//! Data root resolution.

use std::env;
use std::path::PathBuf;

use super::error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "THAW_DATA_DIR";

/// Get the root directory for thaw's per-vault state.
///
/// Resolution order:
/// 1. `THAW_DATA_DIR` environment variable
/// 2. System data directory (e.g., `~/.local/share/thaw`)
pub fn data_root() -> Result<PathBuf, PathError> {
    resolve_data_root(env::var(DATA_DIR_ENV).ok().as_deref())
}

/// Pure form of [`data_root`] taking the override explicitly.
pub fn resolve_data_root(override_dir: Option<&str>) -> Result<PathBuf, PathError> {
    if let Some(dir) = override_dir.map(str::trim).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    Ok(data_dir.join("thaw"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let root = resolve_data_root(Some("/srv/thaw")).unwrap();
        assert_eq!(root, PathBuf::from("/srv/thaw"));
    }

    #[test]
    fn test_blank_override_is_ignored() {
        if let Ok(root) = resolve_data_root(Some("   ")) {
            assert!(root.ends_with("thaw"));
        }
    }
}
