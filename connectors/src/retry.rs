//! Bounded retry with exponential backoff for outbound provider calls.
//!
//! Every adapter funnels its HTTP traffic through [`crate::client::HttpClient`],
//! which wraps each call in [`with_retry`]. Only failures classified as
//! transient (timeouts, refused connections, rate limiting and gateway errors)
//! are retried.

use log::{debug, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Number of retries on top of the initial attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Adds up to 25% random jitter to every backoff
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all, the first failure is final
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Short backoff, mostly useful in tests
    #[must_use]
    pub fn quick() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff.as_secs_f64());

        if self.jitter {
            let factor = 1.0 + rand::thread_rng().gen_range(0.0..0.25);
            Duration::from_secs_f64(capped * factor)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

/// Errors which know whether they are worth another attempt
pub trait RetryableError {
    fn retry_decision(&self) -> RetryDecision;
}

/// Runs `operation` until it succeeds, fails permanently or the attempts
/// allowed by `config` are exhausted. The last error is returned.
///
/// # Errors
/// Returns the error of the final attempt
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if e.retry_decision() == RetryDecision::NoRetry {
                    debug!("{operation_name} failed with a permanent error: {e}");
                    return Err(e);
                }
                if attempt >= config.max_retries {
                    warn!(
                        "{operation_name} failed after {} attempts: {e}",
                        attempt + 1
                    );
                    return Err(e);
                }

                let backoff = config.backoff_duration(attempt);
                warn!(
                    "{operation_name} attempt {}/{} failed, retrying in {:.2}s: {e}",
                    attempt + 1,
                    config.max_retries + 1,
                    backoff.as_secs_f64()
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
