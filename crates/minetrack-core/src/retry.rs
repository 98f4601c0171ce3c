//! Bounded retry with exponential backoff.
//!
//! One combinator serves both per-record inserts during a bulk replace and
//! schema-reprovision recovery in the store.

use std::future::Future;
use std::time::Duration;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (minimum 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for the doubled delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Three attempts with a short backoff, for individual record writes.
    pub const RECORD_WRITE: Self = Self {
        max_attempts: 3,
        base_delay: Duration::from_millis(25),
        max_delay: Duration::from_millis(200),
    };

    /// A single retry, immediately after re-provisioning the schema.
    pub const SCHEMA_RECOVERY: Self = Self {
        max_attempts: 2,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// Delay to wait after `failed_attempt` (1-based) has failed.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Attempt counter handed to the retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt(u32);

impl Attempt {
    /// 1-based attempt number
    pub const fn number(self) -> u32 {
        self.0
    }

    pub const fn is_retry(self) -> bool {
        self.0 > 1
    }
}

/// Run `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or the policy's attempts are used up. The last error is returned.
pub async fn retry_async<T, E, Op, Fut, P>(
    policy: RetryPolicy,
    should_retry: P,
    mut operation: Op,
) -> Result<T, E>
where
    Op: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(Attempt(attempt)).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && should_retry(&error) => {
                let delay = policy.delay_after(attempt);
                tracing::debug!(attempt, ?delay, "Retrying after error: {error}");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const FAST: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    };

    #[test]
    fn delay_doubles_up_to_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(25),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(10));
        assert_eq!(policy.delay_after(2), Duration::from_millis(20));
        assert_eq!(policy.delay_after(3), Duration::from_millis(25));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = retry_async(FAST, |_| true, |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt.number() < 3 {
                    Err("busy".to_string())
                } else {
                    Ok(attempt.number())
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry_async(FAST, |_| true, |_| {
            calls.set(calls.get() + 1);
            async { Err("still broken".to_string()) }
        })
        .await;

        assert_eq!(result, Err("still broken".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn does_not_retry_rejected_errors() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry_async(FAST, |error: &String| error != "fatal", |_| {
            calls.set(calls.get() + 1);
            async { Err("fatal".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
