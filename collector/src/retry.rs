use harvest_core::{CoreError, ErrorExt, RetrySettings};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Attempts made before a throttled call is given up.
pub const MAX_RETRIES: u32 = 5;
/// Seconds per attempt index in the linear backoff.
pub const BASE_SLEEP_MULTIPLIER: u64 = 5;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first call included
    pub max_retries: u32,
    /// Wait after attempt `i` (0-based) is `base_sleep_multiplier * (i + 1)`
    pub base_sleep_multiplier: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_sleep_multiplier: Duration::from_secs(BASE_SLEEP_MULTIPLIER),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries.max(1),
            base_sleep_multiplier: Duration::from_secs(settings.base_sleep_multiplier_secs),
        }
    }
}

/// Linear backoff for the given 0-based attempt index.
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    config.base_sleep_multiplier * (attempt + 1)
}

/// Outcome of a rate-limited call that did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempted<T> {
    Completed(T),
    /// Every attempt was throttled; the unit of work should be skipped.
    Skipped { attempts: u32 },
}

/// Retry metrics for end-of-run reporting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryMetrics {
    pub total_calls: u64,
    pub total_retries: u64,
    pub successful_retries: u64,
    pub skipped_calls: u64,
}

/// Wraps remote calls with bounded retry on throttling.
///
/// Holds no per-call state, so one caller can be shared by every kind of
/// request and each call gets its own retry budget.
#[derive(Debug, Default)]
pub struct RateLimitedCaller {
    config: RetryConfig,
    total_calls: AtomicU64,
    total_retries: AtomicU64,
    successful_retries: AtomicU64,
    skipped_calls: AtomicU64,
}

impl RateLimitedCaller {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation` until it succeeds, fails with a non-throttling error,
    /// or the attempt budget is spent.
    ///
    /// Non-throttling errors are returned as `Err` without retrying.
    /// Exhausting the budget is not an error: it yields
    /// [`Attempted::Skipped`] and logs a warning.
    pub async fn call<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<Attempted<T>, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let max_retries = self.config.max_retries.max(1);
        let mut total_delay = Duration::ZERO;

        for attempt in 0..max_retries {
            if attempt > 0 {
                debug!("Retry attempt {} for {}", attempt, operation_name);
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        self.total_retries
                            .fetch_add(attempt as u64, Ordering::Relaxed);
                        self.successful_retries.fetch_add(1, Ordering::Relaxed);
                        info!(
                            "Operation {} succeeded after {} retries (total delay: {:?})",
                            operation_name, attempt, total_delay
                        );
                    }
                    return Ok(Attempted::Completed(result));
                }
                Err(error) if error.is_rate_limited() => {
                    if attempt + 1 == max_retries {
                        break;
                    }

                    let delay = backoff_delay(attempt, &self.config);
                    total_delay += delay;
                    info!(
                        "Rate limited on {} (attempt {}/{}), sleeping {:?}: {}",
                        operation_name,
                        attempt + 1,
                        max_retries,
                        delay,
                        error
                    );
                    sleep(delay).await;
                }
                Err(error) => {
                    debug!(
                        "Not retrying {} due to error type: {}",
                        operation_name, error
                    );
                    return Err(error);
                }
            }
        }

        self.total_retries
            .fetch_add((max_retries - 1) as u64, Ordering::Relaxed);
        self.skipped_calls.fetch_add(1, Ordering::Relaxed);
        warn!(
            "Giving up on {} after {} rate-limited attempts (total delay: {:?})",
            operation_name, max_retries, total_delay
        );

        Ok(Attempted::Skipped {
            attempts: max_retries,
        })
    }

    /// Get current retry metrics
    pub fn metrics(&self) -> RetryMetrics {
        RetryMetrics {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_retries: self.total_retries.load(Ordering::Relaxed),
            successful_retries: self.successful_retries.load(Ordering::Relaxed),
            skipped_calls: self.skipped_calls.load(Ordering::Relaxed),
        }
    }
}
