//! Opt-in retry wrapper for callers of the wallet engine
//!
//! The engine itself never retries. Callers that are happy to re-run the whole
//! read-decide-write cycle against fresh state can wrap the call here; only
//! [`crate::domain::WalletError::is_retryable`] failures are retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::result::Result;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base backoff delay (doubles each retry: 10, 20, 40ms)
const INITIAL_RETRY_DELAY_MS: u64 = 10;

/// Upper bound on a single backoff delay
const MAX_RETRY_DELAY_MS: u64 = 5_000;

/// Run `operation`, retrying on optimistic-lock conflicts with exponential backoff.
///
/// Non-retryable errors are returned immediately. After `max_retries` failed
/// retries the last conflict is returned.
pub async fn with_retry<T, F, Fut>(max_retries: u32, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "wallet modified concurrently, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    let delay_ms = 2u64
        .checked_pow(attempt)
        .and_then(|factor| factor.checked_mul(INITIAL_RETRY_DELAY_MS))
        .map_or(MAX_RETRY_DELAY_MS, |ms| ms.min(MAX_RETRY_DELAY_MS));
    Duration::from_millis(delay_ms)
}
