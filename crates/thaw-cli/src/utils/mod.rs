//! Terminal helpers shared by the command handlers.

pub mod input;
