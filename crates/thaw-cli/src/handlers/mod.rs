//! Command handlers that delegate to the restore service.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that:
//!   1. Resolve CLI-specific input (flags first, prompts otherwise)
//!   2. Call `RestoreService` methods
//!   3. Format output for the terminal

pub mod catalogue;
pub mod jobs;
pub mod list;
pub mod restore;
pub mod vaults;
