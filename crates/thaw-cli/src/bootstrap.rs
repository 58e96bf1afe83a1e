//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Vault client (via thaw-vault)
//! - Catalogue source (via thaw-db)
//! - Restore service (via thaw-restore)
//!
//! Command handlers receive the composed context and delegate work to it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use thaw_core::paths::resolve_data_root;
use thaw_core::{RestoreObserver, VaultClientPort, VaultPair, VaultPaths};
use thaw_db::SqliteCatalogueSource;
use thaw_restore::{RestoreDeps, RestoreService};
use thaw_vault::{DirectoryVault, DirectoryVaultConfig};
use tokio_util::sync::CancellationToken;

use crate::error::CliError;
use crate::parser::Cli;
use crate::utils::input::prompt_selection;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Directory backing the vault client.
    pub vault_root: PathBuf,
    /// Root of the per-vault working directories.
    pub data_root: PathBuf,
    pub region: String,
    /// Data vault requested on the command line.
    pub vault: Option<String>,
    pub vault_job_delay: Duration,
    pub vault_max_in_progress: Option<usize>,
}

impl CliConfig {
    /// Resolve the configuration from parsed global options.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let vault_root = cli.vault_root.clone().ok_or_else(|| {
            CliError::Config("no vault root given; pass --vault-root or set THAW_VAULT_ROOT".into())
        })?;
        let data_root = resolve_data_root(cli.data_dir.as_deref())
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(Self {
            vault_root,
            data_root,
            region: cli.region.clone(),
            vault: cli.vault.clone(),
            vault_job_delay: Duration::from_secs(cli.vault_job_delay),
            vault_max_in_progress: cli.vault_max_in_progress,
        })
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// The vault client shared by every service.
    pub client: Arc<dyn VaultClientPort>,
    pub config: CliConfig,
    /// Cancelled on Ctrl-C.
    pub cancel: CancellationToken,
}

impl CliContext {
    /// Pick the vault pair to work on.
    ///
    /// An explicitly requested vault must have its catalogue vault next to
    /// it. Otherwise a single candidate is used directly and several are
    /// offered in a menu.
    pub async fn select_vault(&self) -> Result<VaultPair> {
        let names = self.client.list_vaults().await.map_err(|e| CliError::Vault(e.to_string()))?;
        let mut pairs = VaultPair::discover(&names);

        if let Some(requested) = &self.config.vault {
            return pairs
                .into_iter()
                .find(|pair| &pair.data.name == requested)
                .ok_or_else(|| {
                    CliError::Vault(format!(
                        "vault '{requested}' not found or has no catalogue vault '{requested}_mapping'"
                    ))
                    .into()
                });
        }

        match pairs.len() {
            0 => Err(CliError::Vault(format!(
                "no restorable vault under {}",
                self.config.vault_root.display()
            ))
            .into()),
            1 => {
                let pair = pairs.remove(0);
                tracing::info!(vault = %pair.data.name, "Using the only restorable vault");
                Ok(pair)
            }
            _ => {
                let names: Vec<String> = pairs.iter().map(|p| p.data.name.clone()).collect();
                let index = prompt_selection("Select the vault to restore:", &names)?;
                Ok(pairs.swap_remove(index))
            }
        }
    }

    /// Build the restore service for `vaults`, reporting through `observer`.
    pub fn restore_service(
        &self,
        vaults: VaultPair,
        observer: Arc<dyn RestoreObserver>,
    ) -> Result<RestoreService> {
        let paths = VaultPaths::new(&self.config.data_root, &self.config.region, &vaults.data.name)
            .map_err(|e| CliError::Config(e.to_string()))?;
        tracing::debug!(
            region = %self.config.region,
            vault = %vaults.data.name,
            working_dir = %paths.dir().display(),
            "Composing restore service"
        );
        Ok(RestoreService::new(RestoreDeps {
            client: Arc::clone(&self.client),
            catalogue_source: Arc::new(SqliteCatalogueSource::new()),
            observer,
            vaults,
            paths,
        }))
    }
}

/// Bootstrap the CLI with all dependencies wired up.
///
/// A Ctrl-C listener is installed that cancels `CliContext::cancel`.
pub fn bootstrap(config: CliConfig) -> CliContext {
    let client = DirectoryVault::new(
        DirectoryVaultConfig::new(&config.vault_root)
            .with_job_delay(config.vault_job_delay)
            .with_max_in_progress_jobs(config.vault_max_in_progress),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current step");
            on_signal.cancel();
        }
    });

    CliContext {
        client: Arc::new(client),
        config,
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn context(root: &TempDir, vault: Option<&str>) -> CliContext {
        let mut args = vec!["thaw", "--vault-root"];
        let root_arg = root.path().to_str().unwrap().to_string();
        args.push(&root_arg);
        args.extend(["--data-dir", "/tmp/thaw-data"]);
        if let Some(vault) = vault {
            args.extend(["--vault", vault]);
        }
        let cli = Cli::parse_from(args);
        bootstrap(CliConfig::from_cli(&cli).unwrap())
    }

    fn make_vault(root: &TempDir, name: &str) {
        std::fs::create_dir_all(root.path().join(name).join("archives")).unwrap();
    }

    #[tokio::test]
    async fn test_single_pair_is_selected() {
        let root = TempDir::new().unwrap();
        make_vault(&root, "photos");
        make_vault(&root, "photos_mapping");
        make_vault(&root, "orphan");

        let pair = context(&root, None).select_vault().await.unwrap();
        assert_eq!(pair, VaultPair::for_data_vault("photos"));
    }

    #[tokio::test]
    async fn test_requested_vault_needs_catalogue_vault() {
        let root = TempDir::new().unwrap();
        make_vault(&root, "photos");
        make_vault(&root, "photos_mapping");
        make_vault(&root, "orphan");

        let ctx = context(&root, Some("orphan"));
        let err = ctx.select_vault().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::Vault(_))));

        let ctx = context(&root, Some("photos"));
        assert_eq!(ctx.select_vault().await.unwrap().data.name, "photos");
    }

    #[test]
    fn test_no_vault_root_is_a_config_error() {
        let cli = Cli::parse_from(["thaw", "jobs"]);
        if cli.vault_root.is_none() {
            let err = CliConfig::from_cli(&cli).unwrap_err();
            assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::Config(_))));
        }
    }

    #[tokio::test]
    async fn test_working_dir_layout() {
        let root = TempDir::new().unwrap();
        let ctx = context(&root, None);
        let service = ctx
            .restore_service(
                VaultPair::for_data_vault("photos"),
                Arc::new(thaw_core::NoopRestoreObserver::new()),
            )
            .unwrap();
        assert_eq!(
            service.working_dir(),
            std::path::Path::new("/tmp/thaw-data/local/photos")
        );
    }
}
