//! Restore observer port.
//!
//! The engine reports progress through this port without knowing how it is
//! displayed.

use crate::restore::RestoreEvent;

/// Port for receiving restore events.
///
/// Implementations must not block; the engine calls `emit` from its control loop.
pub trait RestoreObserver: Send + Sync {
    fn emit(&self, event: RestoreEvent);
}

/// An observer that discards all events, for tests and quiet runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRestoreObserver;

impl NoopRestoreObserver {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl RestoreObserver for NoopRestoreObserver {
    fn emit(&self, _event: RestoreEvent) {}
}
