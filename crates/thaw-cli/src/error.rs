//! CLI-specific error types and mappings.
//!
//! This module provides error types for the CLI adapter and mappings
//! from `RestoreError` to exit codes and user-facing messages.

use thaw_core::RestoreError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Restore engine error.
    #[error("{}", .0.user_message())]
    Restore(#[source] RestoreError),

    /// Argument error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (terminal input, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested vault cannot be restored.
    #[error("Vault error: {0}")]
    Vault(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    /// - 130: Interrupted
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Restore(RestoreError::Cancelled) => 130,
            Self::Restore(e) if e.is_recoverable() => 75, // EX_TEMPFAIL
            Self::Restore(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Vault(_) => 69,    // EX_UNAVAILABLE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<RestoreError> for CliError {
    fn from(err: RestoreError) -> Self {
        match err {
            RestoreError::InvalidSettings(e) => Self::Config(e.to_string()),
            other => Self::Restore(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Exit code for an error returned by a handler.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}
