//! Restore settings and validation.
//!
//! Budgets and intervals that drive admission control. Pure domain types with
//! no infrastructure dependencies; the CLI fills them from flags and the
//! environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::byte_size::{GIB, MIB};

/// How long a completed retrieval job stays downloadable on the vault.
pub const DEFAULT_JOB_LIFETIME: Duration = Duration::from_secs(4 * 60 * 60);

/// Wall-clock window one download pass is sized for.
pub const DEFAULT_DOWNLOAD_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Sleep between two status polls of an unfinished job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Sleep after the vault refused a submission for rate or policy reasons.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Memory the in-flight download queue may occupy.
pub const QUEUE_MEMORY_BUDGET: u64 = GIB;

/// Estimated footprint of one queued download descriptor: two identifiers
/// (92 and 138 bytes) plus three 8-byte counters and bookkeeping.
pub const QUEUED_DOWNLOAD_FOOTPRINT: u64 = 92 + 138 + 8 + 8 + 8 + 10;

#[allow(clippy::cast_possible_truncation)]
const DEFAULT_MAX_QUEUED_JOBS: usize = (QUEUE_MEMORY_BUDGET / QUEUED_DOWNLOAD_FOOTPRINT) as usize;

/// Tunables for one restore run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreSettings {
    /// Retrieval budget window: never request more than this much time of
    /// downloading ahead of the download pump.
    pub job_lifetime: Duration,

    /// Download budget window for one pump pass.
    pub download_window: Duration,

    /// Sleep between job status polls.
    pub poll_interval: Duration,

    /// Sleep after a rate-limited submission.
    pub rate_limit_cooldown: Duration,

    /// Cap on queued, not-yet-downloaded retrieval jobs.
    pub max_queued_jobs: usize,

    /// Re-estimate throughput after every pump pass.
    pub auto_update_speed: bool,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RestoreSettings {
    /// Create settings with the vault's documented defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            job_lifetime: DEFAULT_JOB_LIFETIME,
            download_window: DEFAULT_DOWNLOAD_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            max_queued_jobs: DEFAULT_MAX_QUEUED_JOBS,
            auto_update_speed: true,
        }
    }

    #[must_use]
    pub const fn with_job_lifetime(mut self, lifetime: Duration) -> Self {
        self.job_lifetime = lifetime;
        self
    }

    #[must_use]
    pub const fn with_download_window(mut self, window: Duration) -> Self {
        self.download_window = window;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.rate_limit_cooldown = cooldown;
        self
    }

    #[must_use]
    pub const fn with_max_queued_jobs(mut self, max: usize) -> Self {
        self.max_queued_jobs = max;
        self
    }

    #[must_use]
    pub const fn with_auto_update_speed(mut self, enabled: bool) -> Self {
        self.auto_update_speed = enabled;
        self
    }

    /// Retrieval budget for a given throughput: bytes that can be downloaded
    /// within one job lifetime, never below one aligned chunk.
    #[must_use]
    pub const fn max_in_flight_retrieval_bytes(&self, bytes_per_second: u64) -> u64 {
        let budget = bytes_per_second.saturating_mul(self.job_lifetime.as_secs());
        if budget < MIB { MIB } else { budget }
    }

    /// Byte budget of one download pass for a given throughput.
    #[must_use]
    pub const fn download_pass_budget(&self, bytes_per_second: u64) -> u64 {
        let budget = bytes_per_second.saturating_mul(self.download_window.as_secs());
        if budget == 0 { 1 } else { budget }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.job_lifetime.as_secs() == 0 {
            return Err(SettingsError::ZeroWindow("job_lifetime"));
        }
        if self.download_window.as_secs() == 0 {
            return Err(SettingsError::ZeroWindow("download_window"));
        }
        if self.download_window > self.job_lifetime {
            return Err(SettingsError::WindowExceedsLifetime {
                window: self.download_window,
                lifetime: self.job_lifetime,
            });
        }
        if self.max_queued_jobs == 0 {
            return Err(SettingsError::EmptyQueue);
        }
        Ok(())
    }
}

/// Errors that can occur during settings validation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} must be at least one second")]
    ZeroWindow(&'static str),

    #[error("Download window {window:?} exceeds job lifetime {lifetime:?}")]
    WindowExceedsLifetime { window: Duration, lifetime: Duration },

    #[error("max_queued_jobs must be at least 1")]
    EmptyQueue,
}
