//! Jobs command handler.

use std::sync::Arc;

use anyhow::Result;
use thaw_core::NoopRestoreObserver;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{format_optional, print_separator, truncate_string};

/// Print every job known to the data vault and its catalogue vault.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let vaults = ctx.select_vault().await?;
    let service = ctx.restore_service(vaults, Arc::new(NoopRestoreObserver::new()))?;
    let jobs = service.list_jobs().await.map_err(CliError::from)?;

    if jobs.is_empty() {
        println!("No jobs on {}.", service.vaults().data.name);
        return Ok(());
    }

    println!(
        "{:<10} {:<18} {:<12} {:<20} {:<24} {:<20} Job",
        "Role", "Action", "Status", "Created", "Archive", "Range"
    );
    print_separator(130);
    for job in &jobs {
        let created = job
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string());
        println!(
            "{:<10} {:<18} {:<12} {:<20} {:<24} {:<20} {}",
            job.role.to_string(),
            job.action.to_string(),
            job.status.to_string(),
            format_optional(created.as_ref(), "--"),
            truncate_string(&format_optional(job.archive_id.as_ref(), "--"), 23),
            format_optional(job.byte_range.as_ref(), "--"),
            job.id
        );
    }
    Ok(())
}
