//! List command handler.
//!
//! Prints every catalogue file matching the filters, then the total size a
//! restore with the same filters would retrieve.

use std::sync::Arc;

use anyhow::Result;
use thaw_core::{NoopRestoreObserver, format_bytes};

use crate::bootstrap::CliContext;
use crate::commands::ListArgs;
use crate::error::CliError;
use crate::handlers::catalogue::resolve_refresh;
use crate::presentation::{print_separator, truncate_string};

pub async fn execute(ctx: &CliContext, args: ListArgs) -> Result<()> {
    let vaults = ctx.select_vault().await?;
    let service = ctx.restore_service(vaults, Arc::new(NoopRestoreObserver::new()))?;

    let refresh = resolve_refresh(&service, args.catalogue.refresh_decision())?;
    service
        .ensure_catalogue(&args.tuning.settings(), refresh, &ctx.cancel)
        .await
        .map_err(CliError::from)?;

    let filters = args.catalogue.path_filters();
    let (files, total) = service.list_files(&filters).await.map_err(CliError::from)?;
    if files.is_empty() {
        println!("No catalogue file matches the filters.");
        return Ok(());
    }

    println!("{:<12} {:<24} Path", "Size", "Archive");
    print_separator(80);
    for file in &files {
        println!(
            "{:<12} {:<24} {}",
            format_bytes(file.size),
            truncate_string(file.archive_id.as_str(), 23),
            file.path
        );
    }
    print_separator(80);
    println!("{} file(s), {} to restore", files.len(), format_bytes(total));
    Ok(())
}
