//! Throughput estimation.
//!
//! The estimate sizes both budgets: the retrieval budget (bytes requested but
//! not downloaded) and the per-pass download budget.

use std::time::Duration;

/// Shortest transfer time a pass is credited with.
const MIN_MEASURED_TIME: Duration = Duration::from_millis(1);

/// Bytes and transfer time accumulated over one pump pass.
///
/// Only time spent streaming job output counts; waiting for a job to become
/// ready says nothing about download speed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassTimer {
    bytes: u64,
    elapsed: Duration,
}

impl PassTimer {
    pub fn record(&mut self, bytes: u64, elapsed: Duration) {
        self.bytes += bytes;
        self.elapsed += elapsed;
    }

    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Observed bytes per second, floored at 1. `None` when nothing moved.
    pub fn rate(&self) -> Option<u64> {
        if self.bytes == 0 {
            return None;
        }
        let seconds = self.elapsed.max(MIN_MEASURED_TIME).as_secs_f64();
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let rate = (self.bytes as f64 / seconds) as u64;
        Some(rate.max(1))
    }
}

/// Current bytes-per-second estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputEstimator {
    bytes_per_second: u64,
    auto_update: bool,
}

impl ThroughputEstimator {
    /// Start from an externally measured or user-provided speed.
    pub fn new(initial_bytes_per_second: u64, auto_update: bool) -> Self {
        Self {
            bytes_per_second: initial_bytes_per_second.max(1),
            auto_update,
        }
    }

    pub const fn bytes_per_second(&self) -> u64 {
        self.bytes_per_second
    }

    /// Replace the estimate with an observation made outside the pump,
    /// when auto-update is on.
    pub fn seed(&mut self, bytes_per_second: u64) -> Option<u64> {
        if !self.auto_update {
            return None;
        }
        self.bytes_per_second = bytes_per_second.max(1);
        Some(self.bytes_per_second)
    }

    /// Fold in a finished pass. Returns the new estimate when it was updated.
    ///
    /// Passes that transferred nothing carry no information and leave the
    /// estimate unchanged.
    pub fn observe(&mut self, pass: &PassTimer) -> Option<u64> {
        if !self.auto_update {
            return None;
        }
        self.bytes_per_second = pass.rate()?;
        Some(self.bytes_per_second)
    }
}
