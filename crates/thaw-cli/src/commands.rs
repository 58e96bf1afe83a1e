//! Main commands enum and shared argument groups.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use thaw_core::settings::{
    DEFAULT_DOWNLOAD_WINDOW, DEFAULT_JOB_LIFETIME, DEFAULT_POLL_INTERVAL,
    DEFAULT_RATE_LIMIT_COOLDOWN,
};
use thaw_core::{PathFilters, RestoreSettings, parse_byte_size};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Restore the vault's file tree into a destination directory
    Restore(RestoreArgs),

    /// List catalogue files matching the filters and the total restore size
    List(ListArgs),

    /// List every job on the data vault and its catalogue vault
    Jobs,

    /// List the vaults that can be restored
    Vaults,
}

/// Arguments of `thaw restore`.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Destination directory; prompted for when omitted
    pub destination: Option<PathBuf>,

    #[command(flatten)]
    pub catalogue: CatalogueArgs,

    /// Keep files already present in the destination
    #[arg(long, conflicts_with = "wipe")]
    pub keep_files: bool,

    /// Delete an existing destination tree before restoring
    #[arg(long)]
    pub wipe: bool,

    /// Initial download speed, e.g. `256K` or `1M` per second
    #[arg(long = "bytes-per-second", env = "THAW_BYTES_PER_SECOND", value_parser = parse_size)]
    pub bytes_per_second: Option<u64>,

    /// URL of a large file used to measure the download speed
    #[arg(long = "speed-test-url", env = "THAW_SPEED_TEST_URL")]
    pub speed_test_url: Option<String>,

    /// Do not stop on the retrieval cost notice
    #[arg(long = "accept-costs")]
    pub accept_costs: bool,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

impl RestoreArgs {
    /// Keep/wipe decision given on the command line, if any.
    pub const fn keep_decision(&self) -> Option<bool> {
        if self.keep_files {
            Some(true)
        } else if self.wipe {
            Some(false)
        } else {
            None
        }
    }
}

/// Arguments of `thaw list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub catalogue: CatalogueArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Catalogue selection shared by `restore` and `list`.
#[derive(Args, Debug)]
pub struct CatalogueArgs {
    /// Restore only paths matching this glob (`*`, `?`); repeatable
    #[arg(short, long = "filter")]
    pub filters: Vec<String>,

    /// Download the catalogue again even when a local copy exists
    #[arg(long, conflicts_with = "no_refresh_catalogue")]
    pub refresh_catalogue: bool,

    /// Use the local catalogue without asking
    #[arg(long)]
    pub no_refresh_catalogue: bool,
}

impl CatalogueArgs {
    pub fn path_filters(&self) -> PathFilters {
        PathFilters::new(&self.filters)
    }

    /// Refresh decision given on the command line, if any.
    pub const fn refresh_decision(&self) -> Option<bool> {
        if self.refresh_catalogue {
            Some(true)
        } else if self.no_refresh_catalogue {
            Some(false)
        } else {
            None
        }
    }
}

/// Engine tunables, all settable from the environment.
#[derive(Args, Debug)]
pub struct TuningArgs {
    /// Seconds of downloading the retrieval budget may run ahead
    #[arg(long, env = "THAW_JOB_LIFETIME", default_value_t = DEFAULT_JOB_LIFETIME.as_secs())]
    pub job_lifetime: u64,

    /// Seconds one download pass is sized for
    #[arg(long, env = "THAW_DOWNLOAD_WINDOW", default_value_t = DEFAULT_DOWNLOAD_WINDOW.as_secs())]
    pub download_window: u64,

    /// Seconds between job status polls
    #[arg(long, env = "THAW_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_interval: u64,

    /// Seconds to wait after the vault rate limited a submission
    #[arg(
        long,
        env = "THAW_RATE_LIMIT_COOLDOWN",
        default_value_t = DEFAULT_RATE_LIMIT_COOLDOWN.as_secs()
    )]
    pub rate_limit_cooldown: u64,

    /// Cap on retrieval jobs waiting to be downloaded
    #[arg(long, env = "THAW_MAX_QUEUED_JOBS")]
    pub max_queued_jobs: Option<usize>,

    /// Keep the initial download speed instead of re-measuring each pass
    #[arg(long = "fixed-speed", env = "THAW_FIXED_SPEED")]
    pub fixed_speed: bool,
}

impl TuningArgs {
    pub fn settings(&self) -> RestoreSettings {
        let mut settings = RestoreSettings::default()
            .with_job_lifetime(Duration::from_secs(self.job_lifetime))
            .with_download_window(Duration::from_secs(self.download_window))
            .with_poll_interval(Duration::from_secs(self.poll_interval))
            .with_rate_limit_cooldown(Duration::from_secs(self.rate_limit_cooldown))
            .with_auto_update_speed(!self.fixed_speed);
        if let Some(max) = self.max_queued_jobs {
            settings = settings.with_max_queued_jobs(max);
        }
        settings
    }
}

/// Parse a byte size such as `10K`, `256K` or `1M`, rejecting zero.
pub fn parse_size(input: &str) -> Result<u64, String> {
    match parse_byte_size(input)? {
        0 => Err("size must be greater than zero".to_string()),
        size => Ok(size),
    }
}
