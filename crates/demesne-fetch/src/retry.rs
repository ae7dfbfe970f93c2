use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Calculate the delay before a retry attempt using exponential backoff.
///
/// The delay formula is: `min(base * 2^retry_count, max)`
///
/// # Arguments
///
/// * `retry_count` - The current retry number (0-indexed: 0 = first retry)
/// * `base` - The base delay duration
/// * `max` - Upper bound on any single delay
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use demesne_fetch::retry_delay;
///
/// // First retry: base * 2^0 = base
/// assert_eq!(
///     retry_delay(0, Duration::from_millis(100), Duration::from_secs(10)),
///     Duration::from_millis(100)
/// );
///
/// // Second retry: base * 2^1 = base * 2
/// assert_eq!(
///     retry_delay(1, Duration::from_millis(100), Duration::from_secs(10)),
///     Duration::from_millis(200)
/// );
///
/// // Growth is clamped at the maximum
/// assert_eq!(
///     retry_delay(4, Duration::from_millis(100), Duration::from_secs(1)),
///     Duration::from_secs(1)
/// );
/// ```
pub fn retry_delay(retry_count: u32, base: Duration, max: Duration) -> Duration {
    // Saturating arithmetic prevents overflow for large retry counts
    let multiplier = 2_u32.saturating_pow(retry_count);

    base.saturating_mul(multiplier).min(max)
}

/// Backoff parameters for [`retry`].
///
/// `max_retries` counts retries beyond the initial attempt, so an operation
/// runs at most `max_retries + 1` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Run `op` with exponential backoff until it succeeds, exhausts its
/// attempts, or fails with an error the predicate declines to retry.
///
/// `op` receives the 0-indexed attempt number. The last error is propagated
/// as-is; [`FetchError::Cancelled`] is never retried regardless of the
/// predicate. This function does not log; observing failures is the
/// caller's concern.
pub async fn retry<T, F, Fut, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
    P: Fn(&FetchError) -> bool,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if matches!(err, FetchError::Cancelled) {
                    return Err(err);
                }
                if attempt >= policy.max_retries || !should_retry(&err) {
                    return Err(err);
                }
                tokio::time::sleep(retry_delay(attempt, policy.base_delay, policy.max_delay))
                    .await;
                attempt += 1;
            }
        }
    }
}
