//! The async retry loop.
//!
//! Every entry point funnels into `run`, which validates the policy,
//! steps a [`RetryState`] from attempt to backoff and back, invokes the
//! operation factory once per attempt, logs each failure and sleeps on the
//! tokio timer between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{ConfigError, RetryError};
use super::policy::RetryPolicy;
use super::state::RetryState;

/// Information about a failed attempt that is about to be retried, passed to
/// hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Label of the retry session.
    pub label: &'a str,
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before the next attempt, jitter included.
    pub next_delay: Duration,
    /// Total elapsed time since the first attempt.
    pub elapsed: Duration,
}

/// Run `operation` with up to `max_attempts` attempts and exponential backoff
/// starting at `base_delay`.
///
/// Uses the default cap and jitter of [`RetryPolicy::exponential`]. `label`
/// only appears in logs and errors.
///
/// # Examples
///
/// ```rust
/// use retrace::{execute, RetryError};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let result: Result<(), RetryError<&str>> =
///     execute(|| async { Ok(()) }, 0, Duration::from_millis(1000), "x").await;
///
/// assert!(result.unwrap_err().is_config());
/// # });
/// ```
pub async fn execute<T, E, F, Fut>(
    operation: F,
    max_attempts: u32,
    base_delay: Duration,
    label: &str,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryPolicy::exponential(base_delay)
        .with_max_attempts(max_attempts)
        .execute(label, operation)
        .await
}

impl RetryPolicy {
    /// Run `operation`, retrying every failure until it succeeds or the
    /// attempt budget is spent.
    ///
    /// The factory is called once per attempt, so each attempt gets a fresh
    /// future. The operation must be safe to run more than once.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retrace::RetryPolicy;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let calls = &AtomicU32::new(0);
    /// let policy = RetryPolicy::exponential(Duration::from_millis(1));
    ///
    /// let value = policy
    ///     .execute("gtin-123", move || async move {
    ///         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
    ///             Err("model overloaded")
    ///         } else {
    ///             Ok("Snowboard")
    ///         }
    ///     })
    ///     .await;
    ///
    /// assert_eq!(value, Ok("Snowboard"));
    /// assert_eq!(calls.load(Ordering::SeqCst), 3);
    /// # });
    /// ```
    pub async fn execute<T, E, F, Fut>(&self, label: &str, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        run(self, label, operation, |_: &E| true, |_: &RetryEvent<'_, E>| {}, None).await
    }

    /// Like [`RetryPolicy::execute`], but an error for which `should_retry`
    /// returns false ends the session at once with [`RetryError::Aborted`].
    pub async fn execute_if<T, E, F, Fut, P>(
        &self,
        label: &str,
        operation: F,
        should_retry: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        run(self, label, operation, should_retry, |_: &RetryEvent<'_, E>| {}, None).await
    }

    /// Like [`RetryPolicy::execute`], calling `on_retry` after every failed
    /// attempt that will be retried.
    ///
    /// The hook runs before the backoff sleep and should not block.
    pub async fn execute_with_hooks<T, E, F, Fut, H>(
        &self,
        label: &str,
        operation: F,
        on_retry: H,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(&RetryEvent<'_, E>),
        E: Display,
    {
        run(self, label, operation, |_: &E| true, on_retry, None).await
    }

    /// Like [`RetryPolicy::execute`], but stops promptly once `cancel` fires.
    ///
    /// Cancellation is observed before each attempt, while an attempt is in
    /// flight (the attempt's future is dropped) and during backoff sleeps (the
    /// timer is dropped). The session then ends with
    /// [`RetryError::Cancelled`].
    pub async fn execute_with_cancel<T, E, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        run(
            self,
            label,
            operation,
            |_: &E| true,
            |_: &RetryEvent<'_, E>| {},
            Some(cancel),
        )
        .await
    }
}

/// The loop behind every `execute*` entry point.
pub(crate) async fn run<T, E, F, Fut, P, H>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
    should_retry: P,
    mut on_retry: H,
    cancel: Option<&CancellationToken>,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    H: FnMut(&RetryEvent<'_, E>),
    E: Display,
{
    policy.validate()?;

    let max_attempts = policy.max_attempts();
    let start = Instant::now();
    let mut state = RetryState::initial();
    let mut last_error: Option<E> = None;

    while let RetryState::Attempting(attempt) = state {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!(label, attempts = attempt, "retry session cancelled");
            return Err(cancelled(label, attempt, last_error));
        }

        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(label, attempts = attempt + 1, "retry session cancelled mid-attempt");
                    return Err(cancelled(label, attempt + 1, last_error));
                }
                outcome = operation() => outcome,
            },
            None => operation().await,
        };

        let error = match outcome {
            Ok(value) => {
                if attempt > 0 {
                    debug!(label, attempts = attempt + 1, "operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !should_retry(&error) {
            warn!(label, attempt = attempt + 1, error = %error, "non-retryable failure");
            return Err(RetryError::Aborted {
                label: label.to_owned(),
                attempts: attempt + 1,
                error,
            });
        }

        state = state.on_failure(max_attempts);
        let RetryState::Waiting(retry) = state else {
            warn!(label, attempts = attempt + 1, error = %error, "retry budget exhausted");
            last_error = Some(error);
            continue;
        };

        let delay = policy.delay_with_jitter(retry);
        warn!(
            label,
            attempt = attempt + 1,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "attempt failed, retrying"
        );
        on_retry(&RetryEvent {
            label,
            attempt: attempt + 1,
            error: &error,
            next_delay: delay,
            elapsed: start.elapsed(),
        });
        last_error = Some(error);

        match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(label, attempts = attempt + 1, "retry session cancelled during backoff");
                    return Err(cancelled(label, attempt + 1, last_error));
                }
                () = tokio::time::sleep(delay) => {}
            },
            None => tokio::time::sleep(delay).await,
        }

        state = state.on_delay_elapsed();
    }

    // the loop only leaves `Attempting` through `Failed`, one attempt per step
    match last_error {
        Some(last_error) => Err(RetryError::Exhausted {
            label: label.to_owned(),
            attempts: max_attempts,
            last_error,
            elapsed: start.elapsed(),
        }),
        None => Err(ConfigError::ZeroAttempts.into()),
    }
}

fn cancelled<E>(label: &str, attempts: u32, last_error: Option<E>) -> RetryError<E> {
    RetryError::Cancelled {
        label: label.to_owned(),
        attempts,
        last_error,
    }
}
