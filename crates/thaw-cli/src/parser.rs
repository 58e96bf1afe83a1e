//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Region name used for the working directory when none is given.
pub const DEFAULT_REGION: &str = "local";

/// Command-line interface definition for the vault restore tool.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "thaw")]
#[command(about = "Restore file trees from cold-storage vaults")]
#[command(version)]
pub struct Cli {
    /// Directory holding one sub-directory per vault
    #[arg(long = "vault-root", env = "THAW_VAULT_ROOT", global = true)]
    pub vault_root: Option<PathBuf>,

    /// Region the vaults live in; separates working directories
    #[arg(long, env = "THAW_REGION", default_value = DEFAULT_REGION, global = true)]
    pub region: String,

    /// Data vault to restore from (its catalogue vault is `<name>_mapping`)
    #[arg(long, env = "THAW_VAULT", global = true)]
    pub vault: Option<String>,

    /// Override the directory holding run caches and catalogues
    #[arg(long = "data-dir", env = "THAW_DATA_DIR", global = true)]
    pub data_dir: Option<String>,

    /// Seconds before a directory-vault job completes
    #[arg(
        long = "vault-job-delay",
        env = "THAW_VAULT_JOB_DELAY",
        default_value_t = 0,
        global = true
    )]
    pub vault_job_delay: u64,

    /// Refuse directory-vault submissions while this many jobs are in progress
    #[arg(long = "vault-max-in-progress", env = "THAW_VAULT_MAX_IN_PROGRESS", global = true)]
    pub vault_max_in_progress: Option<usize>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
