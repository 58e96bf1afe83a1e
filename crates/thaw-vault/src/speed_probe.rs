//! HTTP download speed probe.

use std::time::Instant;

use async_trait::async_trait;
use thaw_core::{SpeedProbeError, SpeedProbePort};

use crate::config::SpeedProbeConfig;

/// Measures throughput by downloading a file over HTTP for a bounded time.
pub struct HttpSpeedProbe {
    client: reqwest::Client,
    config: SpeedProbeConfig,
}

impl HttpSpeedProbe {
    pub fn new(config: SpeedProbeConfig) -> Result<Self, SpeedProbeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SpeedProbeError::Failed(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SpeedProbePort for HttpSpeedProbe {
    async fn measure(&self) -> Result<u64, SpeedProbeError> {
        tracing::info!(url = %self.config.url, "Measuring download speed");

        let mut response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SpeedProbeError::Failed(e.to_string()))?;

        let started = Instant::now();
        let mut received: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SpeedProbeError::Failed(e.to_string()))?
        {
            received += chunk.len() as u64;
            if received >= self.config.max_bytes || started.elapsed() >= self.config.max_duration {
                break;
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        if received == 0 || elapsed <= 0.0 {
            return Err(SpeedProbeError::NoData);
        }

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let bytes_per_second = ((received as f64 / elapsed) as u64).max(1);
        tracing::info!(bytes_per_second, received, "Measured download speed");
        Ok(bytes_per_second)
    }
}
