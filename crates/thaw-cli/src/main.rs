//! CLI entry point - the composition root.
//!
//! Command dispatch routes to handlers, which reach the adapters only
//! through the `CliContext` built by bootstrap.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use thaw_cli::{Cli, CliConfig, CliError, Commands, bootstrap, exit_code_for, handlers};

const VERBOSE_FILTER: &str =
    "info,thaw_core=debug,thaw_db=debug,thaw_vault=debug,thaw_restore=debug,thaw_cli=debug";

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_FILTER } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mut cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.take() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(CliConfig::from_cli(&cli)?);
    match command {
        Commands::Restore(args) => handlers::restore::execute(&ctx, args).await,
        Commands::List(args) => handlers::list::execute(&ctx, args).await,
        Commands::Jobs => handlers::jobs::execute(&ctx).await,
        Commands::Vaults => handlers::vaults::execute(&ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            match e.downcast_ref::<CliError>() {
                Some(cli_error) => eprintln!("Error: {cli_error}"),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::from(exit_code_for(&e))
        }
    }
}
