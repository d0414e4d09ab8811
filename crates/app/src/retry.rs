//! Bounded exponential backoff for store calls.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::StoreError;

/// How transient store failures are retried.
///
/// Only errors for which [`StoreError::is_retryable`] holds are retried; authentication,
/// permission and validation failures are returned on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after the given failed attempt (zero-based), or `None` once attempts are spent.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt.saturating_add(1) >= self.max_attempts {
            return None;
        }

        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let delay = self.initial_delay.saturating_mul(factor);

        Some(delay.min(self.max_delay))
    }

    /// Run `operation`, retrying retryable failures with backoff.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once attempts are spent.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        let mut attempt = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() => {
                    let Some(delay) = self.delay_after(attempt) else {
                        return Err(error);
                    };

                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay = ?delay,
                        error = %error,
                        "retrying store call"
                    );

                    tokio::time::sleep(delay).await;

                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use testresult::TestResult;

    use super::*;

    #[test]
    fn delays_double_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        };

        let delays: Vec<_> = (0..6).map(|attempt| policy.delay_after(attempt)).collect();

        assert_eq!(
            delays,
            vec![
                Some(Duration::from_millis(250)),
                Some(Duration::from_millis(500)),
                Some(Duration::from_secs(1)),
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(2)),
                None,
            ]
        );
    }

    #[test]
    fn a_single_attempt_never_waits() {
        assert_eq!(RetryPolicy::none().delay_after(0), None);
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_is_retried_until_success() -> TestResult {
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let value = RetryPolicy::default()
            .run("probe", || {
                let counter = Arc::clone(&counter);

                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(StoreError::Throttled)
                    } else {
                        Ok(7)
                    }
                }
            })
            .await?;

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_return_the_last_error() {
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), _> = RetryPolicy::default()
            .run("probe", || {
                let counter = Arc::clone(&counter);

                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StoreError::Throttled)
                }
            })
            .await;

        assert!(matches!(result, Err(StoreError::Throttled)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permission_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), _> = RetryPolicy::default()
            .run("create", || {
                let counter = Arc::clone(&counter);

                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StoreError::Permission("write_discounts".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(StoreError::Permission(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
