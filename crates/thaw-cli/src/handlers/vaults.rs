//! Vaults command handler.

use anyhow::Result;
use thaw_core::VaultPair;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Print the data vaults that have a catalogue vault next to them.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let names = ctx
        .client
        .list_vaults()
        .await
        .map_err(|e| CliError::Vault(e.to_string()))?;
    let pairs = VaultPair::discover(&names);

    if pairs.is_empty() {
        println!("No restorable vault under {}.", ctx.config.vault_root.display());
        return Ok(());
    }
    println!("{} restorable vault(s) in {}:", pairs.len(), ctx.config.region);
    for pair in &pairs {
        println!("  {} (catalogue: {})", pair.data.name, pair.catalogue.name);
    }
    Ok(())
}
