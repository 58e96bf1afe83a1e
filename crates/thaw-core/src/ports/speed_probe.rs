//! Download speed probe port.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a speed probe.
#[derive(Debug, Error)]
pub enum SpeedProbeError {
    /// The probe could not reach its endpoint.
    #[error("Speed probe failed: {0}")]
    Failed(String),

    /// The probe finished without transferring anything measurable.
    #[error("Speed probe transferred no data")]
    NoData,
}

/// Port for measuring achievable download throughput.
#[async_trait]
pub trait SpeedProbePort: Send + Sync {
    /// Measured throughput in bytes per second.
    async fn measure(&self) -> Result<u64, SpeedProbeError>;
}
