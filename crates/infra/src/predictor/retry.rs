//! Fixed-delay retry for remote calls.

use std::future::Future;
use std::time::Duration;

/// Retry policy: a fixed number of attempts with a constant pause between them.
///
/// Every error is treated as retryable; there is no backoff growth or jitter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(50),
        }
    }
}

/// Every attempt failed; carries the last error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

impl RetryPolicy {
    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number; `on_error` is called after
    /// every failed attempt.
    pub async fn run<T, E, F, Fut, H>(&self, mut op: F, mut on_error: H) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(u32, &E),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    on_error(attempt, &err);
                    if attempt >= max_attempts {
                        return Err(Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                }
            }

            tokio::time::sleep(self.delay).await;
            attempt += 1;
        }
    }
}
