//! Restore command handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use thaw_core::{RetrievalPolicy, SpeedProbePort, format_bytes};
use thaw_restore::{RestoreSummary, RunConfig};
use thaw_vault::{HttpSpeedProbe, SpeedProbeConfig};

use crate::bootstrap::CliContext;
use crate::commands::RestoreArgs;
use crate::error::CliError;
use crate::handlers::catalogue::resolve_refresh;
use crate::presentation::ProgressObserver;
use crate::utils::input::{prompt_bytes_per_second, prompt_string, prompt_yes_no, wait_for_enter};

/// Execute the restore command.
///
/// Resolves every interactive decision before the run starts, so the
/// progress bar owns the terminal once the engine is running.
pub async fn execute(ctx: &CliContext, args: RestoreArgs) -> Result<()> {
    let vaults = ctx.select_vault().await?;
    println!("Restoring vault {}", vaults.data.name);

    let observer = Arc::new(ProgressObserver::new());
    let service = ctx.restore_service(vaults, observer.clone())?;

    let policy = service.retrieval_policy().await.map_err(CliError::from)?;
    if !warn_about_costs(policy, args.accept_costs)? {
        return Ok(());
    }

    let destination = resolve_destination(args.destination.clone())?;
    let keep_files = resolve_keep_files(&destination, args.keep_decision())?;
    let refresh = resolve_refresh(&service, args.catalogue.refresh_decision())?;
    let bytes_per_second = resolve_speed(&args).await?;

    let config = RunConfig::new(&destination, bytes_per_second)
        .with_filters(args.catalogue.path_filters())
        .with_refresh_catalogue(refresh)
        .with_keep_files(keep_files)
        .with_settings(args.tuning.settings());

    observer.start();
    match service.restore(&config, &ctx.cancel).await {
        Ok(summary) => {
            print_summary(&destination, &summary);
            Ok(())
        }
        Err(e) => {
            observer.abandon("restore stopped");
            Err(CliError::from(e).into())
        }
    }
}

/// Print the cost notice when retrievals may be billed.
///
/// Returns `false` when the user backs out.
fn warn_about_costs(policy: RetrievalPolicy, accepted: bool) -> Result<bool> {
    if !policy.may_incur_cost() {
        return Ok(true);
    }
    let name = match policy {
        RetrievalPolicy::BytesPerHour(bytes) => format!("capped at {}/hour", format_bytes(bytes)),
        RetrievalPolicy::Unlimited => "unlimited".to_string(),
        RetrievalPolicy::FreeTier => "free tier".to_string(),
    };
    eprintln!("WARNING: the vault's data retrieval policy is {name}.");
    eprintln!("Retrievals beyond the free allowance may be billed.");
    eprintln!("Switch the policy to free tier to avoid these costs.");
    if accepted {
        return Ok(true);
    }
    prompt_yes_no("Continue anyway?", false)
}

fn resolve_destination(given: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = given {
        return Ok(path);
    }
    let answer = prompt_string("Destination directory:")?;
    if answer.is_empty() {
        return Err(CliError::Arguments("no destination given".into()).into());
    }
    Ok(PathBuf::from(answer))
}

/// Decide whether files already in `destination` are kept.
///
/// Wiping needs a second confirmation; declining it asks again.
fn resolve_keep_files(destination: &Path, decision: Option<bool>) -> Result<bool> {
    if let Some(keep) = decision {
        return Ok(keep);
    }
    if !destination.is_dir() {
        return Ok(true);
    }
    loop {
        if prompt_yes_no("The destination exists. Keep existing files?", true)? {
            return Ok(true);
        }
        if prompt_yes_no("Are you sure? Every existing file will be deleted.", false)? {
            return Ok(false);
        }
    }
}

/// Initial download speed: flag, then the speed probe, then a prompt.
async fn resolve_speed(args: &RestoreArgs) -> Result<u64> {
    if let Some(speed) = args.bytes_per_second {
        return Ok(speed);
    }
    if let Some(url) = &args.speed_test_url {
        let measured = match HttpSpeedProbe::new(SpeedProbeConfig::new(url)) {
            Ok(probe) => probe.measure().await,
            Err(e) => Err(e),
        };
        match measured {
            Ok(speed) => {
                println!("Measured download speed: {}/s", format_bytes(speed));
                return Ok(speed);
            }
            Err(e) => eprintln!("Cannot measure download speed: {e}"),
        }
    }
    prompt_bytes_per_second()
}

fn print_summary(destination: &Path, summary: &RestoreSummary) {
    println!();
    println!("Restored into {}", destination.display());
    println!("  archives restored:  {}", summary.archives_restored);
    println!("  already present:    {}", summary.archives_skipped);
    if summary.archives_missing > 0 {
        println!("  missing on vault:   {}", summary.archives_missing);
    }
    println!("  downloaded:         {}", format_bytes(summary.bytes_downloaded));
    println!(
        "  retrieval jobs:     {} submitted, {} reused",
        summary.jobs_submitted, summary.jobs_reused
    );
}
