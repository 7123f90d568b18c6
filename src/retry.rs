//! Retry logic with exponential backoff for probe operations.
//!
//! Latency sampling retries a failed sample before giving up; this module
//! holds the backoff policy and the async driver for it.

use crate::errors::ProbeError;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Default number of retry attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default base delay for exponential backoff (in milliseconds).
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Maximum delay cap for exponential backoff (in milliseconds).
pub const DEFAULT_MAX_DELAY_MS: u64 = 2000;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration.
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self { max_retries, base_delay_ms, max_delay_ms }
    }

    /// A configuration that tries exactly once.
    pub fn no_retry() -> Self {
        Self::new(0, 0, 0)
    }

    /// Delay before retry number `attempt + 1`.
    ///
    /// The delay is calculated as: base_delay * 2^attempt, capped at max_delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
        let capped_delay_ms = delay_ms.min(self.max_delay_ms);
        Duration::from_millis(capped_delay_ms)
    }

    /// Total number of attempts including the first one.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after all retries.
    Failed {
        /// The last error that occurred.
        last_error: ProbeError,
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Execute an async operation with retry logic and exponential backoff.
///
/// `f` is invoked up to `config.max_retries + 1` times. Every failure is
/// logged; the last one is returned in [`RetryResult::Failed`].
pub async fn retry_async<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> RetryResult<T>
where
    E: Into<ProbeError>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total_attempts = config.total_attempts();
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt - 1);
            debug!(
                "{}: Retry attempt {}/{} after {:?} delay",
                operation_name, attempt, config.max_retries, delay
            );
            sleep(delay).await;
        }

        let error: ProbeError = match f().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "{}: Succeeded on attempt {}",
                        operation_name,
                        attempt + 1
                    );
                }
                return RetryResult::Success(result);
            }
            Err(e) => e.into(),
        };

        attempt += 1;

        if attempt < total_attempts {
            warn!("{}: Attempt {} failed: {}", operation_name, attempt, error);
        } else {
            warn!(
                "{}: All {} attempts failed. Last error: {}",
                operation_name, total_attempts, error
            );
            return RetryResult::Failed {
                last_error: error,
                attempts: total_attempts,
            };
        }
    }
}
