//! Retry logic with capped exponential backoff
//!
//! This module provides the retry driver used by the resilient fetcher.
//! It implements exponential backoff with optional jitter to prevent
//! thundering herd against the remote catalog service.
//!
//! `RetryConfig::max_attempts` is a TOTAL attempt budget: a value of 3 means
//! at most three requests are issued for one call (one initial attempt plus
//! up to two retries).
//!
//! # Example
//!
//! ```no_run
//! use catalog_dl::retry::{IsRetryable, fetch_with_retry};
//! use catalog_dl::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = fetch_with_retry(&config, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::FetchErrorKind;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, connection resets, server overload)
/// should return `true`. Permanent failures (a 404, a malformed payload that
/// will parse the same way every time) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchErrorKind {
    fn is_retryable(&self) -> bool {
        match self {
            // Timeouts and connection-level failures are transient
            FetchErrorKind::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            // Server overload and server-side failures may clear up;
            // client errors like 404 will not
            FetchErrorKind::Status(status) => {
                status.is_server_error()
                    || *status == reqwest::StatusCode::REQUEST_TIMEOUT
                    || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            // The same body will fail to parse the same way again
            FetchErrorKind::Parse(_) => false,
            // Cancellation must propagate promptly
            FetchErrorKind::Cancelled => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (attempt budget, delays, backoff multiplier, jitter)
/// * `operation` - Async closure returning `Result<T, E>` where `E` implements [`IsRetryable`]
///
/// # Returns
///
/// The successful result, or the last error once the attempt budget is
/// exhausted or a non-retryable error occurs. At most `config.max_attempts`
/// invocations of `operation` are performed; a budget of zero is treated as
/// one attempt.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let budget = config.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Fetch succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < budget => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = budget,
                    delay_ms = delay.as_millis(),
                    "Fetch attempt failed, retrying"
                );
                attempt += 1;

                let jittered_delay = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(jittered_delay).await;

                // Capped exponential backoff
                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        error = %e,
                        attempts = attempt,
                        "Fetch failed after all attempts exhausted"
                    );
                } else {
                    tracing::warn!(error = %e, "Fetch failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay falls between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
