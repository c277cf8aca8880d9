//! Error types for retry operations.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A retry policy that cannot be executed.
///
/// Returned before the operation is invoked; configuration errors are never
/// retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The attempt budget was zero.
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    /// The jitter fraction was not a finite number in `[0, 1]`.
    #[error("jitter fraction must be within [0, 1], got {0}")]
    InvalidJitterFraction(f64),
}

/// Terminal failure of a retry session.
///
/// Every variant except [`RetryError::Config`] carries the label the caller
/// supplied, so the error can be correlated with the per-attempt log lines.
///
/// # Examples
///
/// ```rust
/// use retrace::{RetryError, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::exponential(Duration::from_millis(1)).with_max_attempts(2);
///
/// let result = policy
///     .execute("store-check", || async { Err::<(), _>("store unreachable") })
///     .await;
///
/// match result {
///     Err(RetryError::Exhausted { attempts, last_error, .. }) => {
///         assert_eq!(attempts, 2);
///         assert_eq!(last_error, "store unreachable");
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// # });
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// The policy was invalid; the operation was never invoked.
    Config(ConfigError),

    /// Every attempt failed.
    Exhausted {
        /// Caller-supplied correlation label.
        label: String,
        /// Number of attempts made; always the policy's `max_attempts`.
        attempts: u32,
        /// The error from the final attempt, unmodified.
        last_error: E,
        /// Time from the first attempt to the final failure.
        elapsed: Duration,
    },

    /// The operation failed with an error the caller marked non-retryable.
    Aborted {
        /// Caller-supplied correlation label.
        label: String,
        /// Number of attempts made, including the aborting one.
        attempts: u32,
        /// The non-retryable error.
        error: E,
    },

    /// The caller's cancellation token fired.
    Cancelled {
        /// Caller-supplied correlation label.
        label: String,
        /// Number of attempts started before cancellation.
        attempts: u32,
        /// The most recent completed failure, if any.
        last_error: Option<E>,
    },
}

impl<E> RetryError<E> {
    /// The label of the retry session, if it got past validation.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Config(_) => None,
            Self::Exhausted { label, .. }
            | Self::Aborted { label, .. }
            | Self::Cancelled { label, .. } => Some(label),
        }
    }

    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Config(_) => 0,
            Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// The most recent operation error, if one was observed.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Config(_) => None,
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Aborted { error, .. } => Some(error),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Extract the most recent operation error, discarding metadata.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Config(_) => None,
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Aborted { error, .. } => Some(error),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }

    /// Returns true if the attempt budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns true if the policy was rejected before running.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if the session was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl<E> From<ConfigError> for RetryError<E> {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid retry policy: {err}"),
            Self::Exhausted {
                label,
                attempts,
                last_error,
                elapsed,
            } => write!(
                f,
                "{label}: failed after {attempts} attempts ({elapsed:?}): {last_error}"
            ),
            Self::Aborted {
                label,
                attempts,
                error,
            } => write!(
                f,
                "{label}: non-retryable failure on attempt {attempts}: {error}"
            ),
            Self::Cancelled {
                label, attempts, ..
            } => write!(f, "{label}: cancelled after {attempts} attempts"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Aborted { error, .. } => Some(error),
            Self::Cancelled { last_error, .. } => {
                last_error.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// Error returned by [`with_timeout`](crate::retry::with_timeout).
///
/// Wraps either the deadline being hit or the future's own error, so a
/// timed-out attempt can be fed to the retry loop like any other failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutError<E> {
    /// The operation timed out.
    Timeout {
        /// The timeout duration that was exceeded.
        duration: Duration,
    },
    /// The operation failed before the deadline.
    Inner(E),
}

impl<E> TimeoutError<E> {
    /// Returns true if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Get the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Timeout { .. } => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { duration } => write!(f, "timed out after {duration:?}"),
            Self::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TimeoutError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timeout { .. } => None,
            Self::Inner(e) => Some(e),
        }
    }
}
