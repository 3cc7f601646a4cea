//! Bounded retry for places provider calls.
//!
//! Only [`PlacesError::Provider`] is retried. [`PlacesError::RateLimited`] is
//! returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::PlacesError;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay before retry `retry` (1-based): `base_ms` doubled per retry, scaled
/// by a jitter factor in `[0.75, 1.25)`, capped at 30 s.
fn retry_delay(base_ms: u64, retry: u32) -> Duration {
    let doubled = base_ms.saturating_mul(1 << retry.saturating_sub(1).min(10));
    let jitter = 0.75 + rand::random::<f64>() * 0.5;
    Duration::from_millis(doubled)
        .mul_f64(jitter)
        .min(MAX_RETRY_DELAY)
}

/// Runs `operation`, retrying a provider failure up to `max_retries` times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, PlacesError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    let mut retries = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !matches!(err, PlacesError::Provider { .. }) || retries >= max_retries {
            return Err(err);
        }
        retries += 1;
        let delay = retry_delay(backoff_base_ms, retries);
        tracing::warn!(
            retry = retries,
            max_retries,
            ?delay,
            error = %err,
            "places provider failed; retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
