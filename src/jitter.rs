//! Ping and jitter estimation from repeated latency samples.
//!
//! Every sample re-runs server discovery before timing a round trip, so a
//! sample reflects the server the backend would pick at that moment. Jitter
//! is the sample standard deviation of the collected latencies.
//!
//! Estimation never fails. If a sample still fails after its retry, the
//! estimate falls back to fixed defaults and says so, leaving the decision
//! of how loudly to report it to the caller.

use crate::errors::{MeasurementError, ProbeError};
use crate::probe::NetworkProbe;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::retry::{retry_async, RetryConfig, RetryResult};
use crate::stats::{mean, sample_std_dev};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::sleep;

/// Mean ping reported when sampling fails.
pub const FALLBACK_PING_MS: f64 = 50.0;

/// Jitter reported when sampling fails.
pub const FALLBACK_JITTER_MS: f64 = 5.0;

/// Default number of latency samples.
pub const DEFAULT_SAMPLE_COUNT: usize = 5;

/// Default pause between samples.
pub const DEFAULT_INTER_SAMPLE_DELAY: Duration = Duration::from_millis(200);

/// Where an estimate's numbers came from.
#[derive(Debug, Clone, PartialEq)]
pub enum LatencySource {
    /// Computed from this many successful samples.
    Measured { samples: usize },
    /// Sampling failed; the fixed fallback values were used.
    Fallback { reason: String },
}

/// Mean latency and its variability.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyEstimate {
    pub mean_ping_ms: f64,
    pub jitter_ms: f64,
    pub source: LatencySource,
}

impl LatencyEstimate {
    fn fallback(reason: impl Into<String>) -> Self {
        Self {
            mean_ping_ms: FALLBACK_PING_MS,
            jitter_ms: FALLBACK_JITTER_MS,
            source: LatencySource::Fallback { reason: reason.into() },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.source, LatencySource::Fallback { .. })
    }

    /// A non-fatal error describing the fallback, if one was used.
    pub fn degradation(&self) -> Option<MeasurementError> {
        match &self.source {
            LatencySource::Fallback { reason } => {
                Some(MeasurementError::probe_degraded(reason.clone()))
            }
            LatencySource::Measured { .. } => None,
        }
    }
}

/// Samples latency from a probe and summarizes it.
#[derive(Debug, Clone)]
pub struct JitterEstimator {
    sample_count: usize,
    inter_sample_delay: Duration,
    retry: RetryConfig,
}

impl Default for JitterEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_COUNT, DEFAULT_INTER_SAMPLE_DELAY)
    }
}

impl JitterEstimator {
    /// A sample count of zero is treated as one.
    pub fn new(sample_count: usize, inter_sample_delay: Duration) -> Self {
        Self {
            sample_count: sample_count.max(1),
            inter_sample_delay,
            retry: RetryConfig::default(),
        }
    }

    /// Set the retry policy applied to each sample.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Collect samples and compute mean ping and jitter.
    pub async fn estimate<P: NetworkProbe>(
        &self,
        probe: &P,
        sink: &dyn ProgressSink,
    ) -> LatencyEstimate {
        let total = self.sample_count;
        let mut samples = Vec::with_capacity(total);

        info!("Collecting {} latency samples", total);

        for current in 1..=total {
            let outcome =
                retry_async(&self.retry, "latency sample", || sample_once(probe))
                    .await;

            match outcome {
                RetryResult::Success(value_ms) => {
                    debug!("Latency sample {}/{}: {:.2} ms", current, total, value_ms);
                    samples.push(value_ms);
                    sink.on_progress(ProgressEvent::LatencySample {
                        value_ms,
                        current,
                        total,
                    });
                }
                RetryResult::Failed { last_error, attempts } => {
                    let reason = format!(
                        "latency sample {}/{} failed after {} attempts: {}",
                        current, total, attempts, last_error
                    );
                    warn!("{}; using fallback ping and jitter", reason);
                    return LatencyEstimate::fallback(reason);
                }
            }

            if current < total && !self.inter_sample_delay.is_zero() {
                sleep(self.inter_sample_delay).await;
            }
        }

        match (mean(&samples), sample_std_dev(&samples)) {
            (Some(mean_ping_ms), Some(jitter_ms)) => LatencyEstimate {
                mean_ping_ms,
                jitter_ms,
                source: LatencySource::Measured { samples: samples.len() },
            },
            _ => LatencyEstimate::fallback("no latency samples were collected"),
        }
    }
}

async fn sample_once<P: NetworkProbe>(probe: &P) -> Result<f64, ProbeError> {
    let server = probe.discover_server().await?;
    let value_ms = probe.measure_latency(&server).await?;

    if !value_ms.is_finite() || value_ms < 0.0 {
        return Err(format!("invalid latency value {} ms", value_ms).into());
    }

    Ok(value_ms)
}
