//! Public configuration for the vault adapters.

use std::path::PathBuf;
use std::time::Duration;

use thaw_core::RetrievalPolicy;

/// Configuration for [`DirectoryVault`](crate::DirectoryVault).
///
/// # Example
///
/// ```
/// use thaw_vault::DirectoryVaultConfig;
/// use std::time::Duration;
///
/// let config = DirectoryVaultConfig::new("/srv/vaults")
///     .with_job_delay(Duration::from_secs(3 * 60 * 60))
///     .with_max_in_progress_jobs(Some(4));
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryVaultConfig {
    /// Directory holding one sub-directory per vault
    pub(crate) root: PathBuf,
    /// Time between submitting a job and its output becoming available
    pub(crate) job_delay: Duration,
    /// Time a job stays listed and downloadable after submission
    pub(crate) job_retention: Duration,
    /// Submissions are refused while this many jobs are in progress
    pub(crate) max_in_progress_jobs: Option<usize>,
    /// Jobs per listing page
    pub(crate) page_size: usize,
    /// Policy reported to callers
    pub(crate) policy: RetrievalPolicy,
}

impl DirectoryVaultConfig {
    /// Create a configuration rooted at `root` with immediate job readiness.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            job_delay: Duration::ZERO,
            job_retention: Duration::from_secs(24 * 60 * 60),
            max_in_progress_jobs: None,
            page_size: 50,
            policy: RetrievalPolicy::FreeTier,
        }
    }

    /// Set the delay before a submitted job completes.
    #[must_use]
    pub const fn with_job_delay(mut self, delay: Duration) -> Self {
        self.job_delay = delay;
        self
    }

    /// Set how long jobs remain available after submission.
    ///
    /// Defaults to 24 hours.
    #[must_use]
    pub const fn with_job_retention(mut self, retention: Duration) -> Self {
        self.job_retention = retention;
        self
    }

    /// Limit concurrently in-progress jobs; further submissions are rate limited.
    #[must_use]
    pub const fn with_max_in_progress_jobs(mut self, max: Option<usize>) -> Self {
        self.max_in_progress_jobs = max;
        self
    }

    /// Set the number of jobs returned per listing page.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the retrieval policy the vault reports.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetrievalPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Configuration for [`HttpSpeedProbe`](crate::HttpSpeedProbe).
#[derive(Debug, Clone)]
pub struct SpeedProbeConfig {
    /// URL of a large file to download
    pub(crate) url: String,
    /// Stop measuring after this long
    pub(crate) max_duration: Duration,
    /// Stop measuring after this many bytes
    pub(crate) max_bytes: u64,
    /// Connect timeout
    pub(crate) connect_timeout: Duration,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
}

impl SpeedProbeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_duration: Duration::from_secs(10),
            max_bytes: 100 * 1024 * 1024,
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("thaw/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the measuring time limit.
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    /// Set the measured byte limit.
    #[must_use]
    pub const fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = bytes;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directory_config() {
        let config = DirectoryVaultConfig::new("/vaults");
        assert_eq!(config.root, PathBuf::from("/vaults"));
        assert_eq!(config.job_delay, Duration::ZERO);
        assert!(config.max_in_progress_jobs.is_none());
        assert_eq!(config.policy, RetrievalPolicy::FreeTier);
    }

    #[test]
    fn test_builder_pattern() {
        let config = DirectoryVaultConfig::new("/vaults")
            .with_job_delay(Duration::from_secs(60))
            .with_job_retention(Duration::from_secs(120))
            .with_max_in_progress_jobs(Some(2))
            .with_page_size(5)
            .with_policy(RetrievalPolicy::Unlimited);

        assert_eq!(config.job_delay, Duration::from_secs(60));
        assert_eq!(config.job_retention, Duration::from_secs(120));
        assert_eq!(config.max_in_progress_jobs, Some(2));
        assert_eq!(config.page_size, 5);
        assert_eq!(config.policy, RetrievalPolicy::Unlimited);
    }

    #[test]
    fn test_speed_probe_config() {
        let config = SpeedProbeConfig::new("http://example.invalid/file")
            .with_max_duration(Duration::from_secs(3))
            .with_max_bytes(1024);
        assert_eq!(config.max_duration, Duration::from_secs(3));
        assert_eq!(config.max_bytes, 1024);
        assert!(config.user_agent.starts_with("thaw/"));
    }
}
