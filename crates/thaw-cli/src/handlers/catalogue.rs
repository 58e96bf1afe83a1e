//! Catalogue refresh decision shared by `restore` and `list`.

use std::time::SystemTime;

use anyhow::Result;
use chrono::{DateTime, Local};
use thaw_restore::RestoreService;

use crate::utils::input::prompt_yes_no;

/// Render a modification time the way the refresh prompt shows it.
pub fn format_modified(modified: SystemTime) -> String {
    DateTime::<Local>::from(modified)
        .format("%a %b %e %H:%M:%S %Y")
        .to_string()
}

/// Decide whether to download the catalogue again.
///
/// A flag decision wins. Without a local copy there is nothing to refresh;
/// otherwise the user is asked, defaulting to the local copy.
pub fn resolve_refresh(service: &RestoreService, decision: Option<bool>) -> Result<bool> {
    if let Some(refresh) = decision {
        return Ok(refresh);
    }
    let Some(modified) = service.catalogue_modified() else {
        return Ok(false);
    };
    prompt_yes_no(
        &format!(
            "A local catalogue from {} exists. Download a new one?",
            format_modified(modified)
        ),
        false,
    )
}
