//! Fixed-backoff retry for step submissions.
//!
//! Network faults and unrecognized pages share one attempt budget. The
//! server's application-error page is stable for a given request shape and is
//! returned immediately without retrying.

use std::future::Future;
use std::time::Duration;

use crate::error::StepError;
use crate::schema::StepKind;

/// Transport failures and pages missing their expected markup may clear up on
/// resubmission; the remote engine serves the latter while a session warms up.
fn is_retriable(err: &StepError) -> bool {
    matches!(err, StepError::Http(_) | StepError::TransientMiss { .. })
}

/// Submits a step up to `1 + max_retries` times, pausing `backoff` between
/// submissions. Running out yields [`StepError::RetryExhausted`] with the
/// final failure's text.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    step: StepKind,
    max_retries: u32,
    backoff: Duration,
    mut operation: F,
) -> Result<T, StepError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StepError>>,
{
    let mut attempt = 0u32;

    loop {
        let last_err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retriable(&err) => return Err(err),
            Err(err) => err,
        };

        if attempt >= max_retries {
            return Err(StepError::RetryExhausted {
                step,
                attempts: attempt + 1,
                last: last_err.to_string(),
            });
        }

        tracing::warn!(
            %step,
            attempt,
            max_retries,
            delay_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            error = %last_err,
            "transient step failure, retrying after backoff"
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn miss() -> StepError {
        StepError::TransientMiss {
            step: StepKind::ListDays,
        }
    }

    /// Run the retry loop with `outcome(n)` answering the n-th call (0-based);
    /// returns the result and how many calls were made.
    async fn drive(
        step: StepKind,
        max_retries: u32,
        outcome: impl Fn(u32) -> Result<u32, StepError>,
    ) -> (Result<u32, StepError>, u32) {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(step, max_retries, Duration::ZERO, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let answer = outcome(n);
            async move { answer }
        })
        .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn first_success_is_returned() {
        let (result, calls) = drive(StepKind::ListDays, 3, |_| Ok(42)).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn transient_misses_are_retried() {
        let (result, calls) =
            drive(StepKind::ListDays, 3, |n| if n < 2 { Err(miss()) } else { Ok(99) }).await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn exhaustion_counts_every_attempt() {
        let (result, calls) = drive(StepKind::ListTimes, 2, |_| Err(miss())).await;
        assert_eq!(calls, 3);
        assert!(matches!(
            result,
            Err(StepError::RetryExhausted {
                step: StepKind::ListTimes,
                attempts: 3,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn application_error_page_is_not_retried() {
        let (result, calls) = drive(StepKind::ListLocations, 5, |_| {
            Err(StepError::ServerError {
                step: StepKind::ListLocations,
            })
        })
        .await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(StepError::ServerError { .. })));
    }

    #[tokio::test]
    async fn zero_retries_is_a_single_attempt() {
        let (result, calls) = drive(StepKind::ListDays, 0, |_| Err(miss())).await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(StepError::RetryExhausted { attempts: 1, .. })));
    }
}
