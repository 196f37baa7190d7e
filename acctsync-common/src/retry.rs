//! Bounded sleep-and-retry helper for provider throttling responses.
//!
//! The donor implementation's CloudFormation stack enumerator retries
//! throttling responses forever (`time.Sleep(1 * time.Second); continue`).
//! Here the retry count is bounded (see DESIGN.md, Open Question (b)):
//! after `max_attempts` consecutive throttling responses the last error is
//! returned instead of retrying indefinitely.
use std::fmt;
use std::time::Duration;

use tokio::time::sleep;

const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s), last error: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Calls `op` until it succeeds, `is_retryable` returns false for the
/// error, or `max_attempts` have been made. Sleeps `DEFAULT_BACKOFF`
/// between attempts, matching the donor's 1-second throttling backoff.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    max_attempts: u32,
    is_retryable: R,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !is_retryable(&err) {
                    return Err(RetryError {
                        attempts: attempt,
                        last_error: err,
                    });
                }
                sleep(DEFAULT_BACKOFF).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn succeeds_without_retry() {
        let result: Result<i32, &str> =
            retry_with_backoff(3, |_: &&str| true, || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result = retry_with_backoff(3, |_: &&str| true, || {
            calls.set(calls.get() + 1);
            async { Err::<i32, &str>("throttled") }
        })
        .await;

        assert_eq!(calls.get(), 3);
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, "throttled");
    }

    #[tokio::test]
    async fn stops_immediately_on_non_retryable_error() {
        let calls = Cell::new(0);
        let result = retry_with_backoff(5, |e: &&str| *e == "throttled", || {
            calls.set(calls.get() + 1);
            async { Err::<i32, &str>("fatal") }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert_eq!(result.unwrap_err().last_error, "fatal");
    }
}
