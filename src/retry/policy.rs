//! Retry policy types and backoff schedule.

use std::time::Duration;

use rand::Rng;

use super::error::ConfigError;

/// Attempt budget used when none is given explicitly.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Ceiling applied to every backoff delay before jitter.
pub const DEFAULT_CAP_DELAY: Duration = Duration::from_secs(120);

/// Fraction of the backoff delay that jitter may add on top of it.
pub const DEFAULT_JITTER_FRACTION: f64 = 0.2;

/// A retry policy describing how to retry a failed operation.
///
/// Policies are plain data: they describe retry behavior but don't execute
/// it. Execution lives in the `execute*` methods, which validate the policy
/// before the operation is ever invoked.
///
/// The delay before retry `n` (0 for the first retry) is
/// `min(base_delay * 2^n, cap_delay)` plus a uniformly random jitter of up to
/// `jitter_fraction` of that delay.
///
/// # Examples
///
/// ```rust
/// use retrace::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(100))
///     .with_max_attempts(5);
///
/// assert_eq!(policy.max_attempts(), 5);
/// assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
/// assert_eq!(policy.backoff_delay(3), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    cap_delay: Duration,
    jitter_fraction: f64,
}

impl RetryPolicy {
    /// Create an exponential backoff policy.
    ///
    /// Starts with [`DEFAULT_MAX_ATTEMPTS`], [`DEFAULT_CAP_DELAY`] and
    /// [`DEFAULT_JITTER_FRACTION`].
    pub fn exponential(base_delay: Duration) -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay,
            cap_delay: DEFAULT_CAP_DELAY,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }

    /// Set the total number of attempts, including the first one.
    ///
    /// Zero is accepted here and rejected by [`RetryPolicy::validate`], so a
    /// misconfigured policy fails when it is used rather than looping once.
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the ceiling for the pre-jitter delay.
    ///
    /// ```rust
    /// use retrace::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_millis(100))
    ///     .with_max_attempts(10)
    ///     .with_cap_delay(Duration::from_millis(500));
    ///
    /// assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
    /// assert_eq!(policy.backoff_delay(3), Duration::from_millis(500));
    /// ```
    pub fn with_cap_delay(mut self, cap: Duration) -> Self {
        self.cap_delay = cap;
        self
    }

    /// Set the jitter fraction. Must lie in `[0, 1]`.
    pub fn with_jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    /// Disable jitter, making every wait exactly [`RetryPolicy::backoff_delay`].
    pub fn without_jitter(self) -> Self {
        self.with_jitter_fraction(0.0)
    }

    /// Total number of attempts, including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry, before jitter.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Ceiling on the pre-jitter delay.
    pub fn cap_delay(&self) -> Duration {
        self.cap_delay
    }

    /// Fraction of the delay that jitter may add.
    pub fn jitter_fraction(&self) -> f64 {
        self.jitter_fraction
    }

    /// Check the policy can be executed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if !self.jitter_fraction.is_finite() || !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err(ConfigError::InvalidJitterFraction(self.jitter_fraction));
        }
        Ok(())
    }

    /// The delay before retry `retry` (0-indexed), without jitter.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        // a nonzero base passes any cap within ~95 doublings
        let mut delay = self.base_delay;
        for _ in 0..retry {
            if delay >= self.cap_delay {
                break;
            }
            delay = delay.saturating_mul(2);
        }
        delay.min(self.cap_delay)
    }

    /// Inclusive upper bound on the actual wait before retry `retry`.
    pub fn max_wait(&self, retry: u32) -> Duration {
        self.jittered(retry, 1.0)
    }

    /// Sum of [`RetryPolicy::max_wait`] across every retry the policy allows.
    ///
    /// This is the longest the policy itself can spend sleeping; time spent
    /// inside the operation comes on top.
    pub fn worst_case_delay(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|retry| self.max_wait(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Draw the actual wait before retry `retry`, jitter included.
    pub fn delay_with_jitter(&self, retry: u32) -> Duration {
        let sample: f64 = rand::rng().random();
        self.jittered(retry, sample)
    }

    /// Apply jitter for a given uniform `sample` in `[0, 1]`.
    pub(crate) fn jittered(&self, retry: u32, sample: f64) -> Duration {
        let delay = self.backoff_delay(retry);
        let secs = delay.as_secs_f64() * sample * self.jitter_fraction;
        let jitter = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
        delay.saturating_add(jitter)
    }
}

impl Default for RetryPolicy {
    /// The policy AI lookups use: 3 attempts starting at one second.
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1))
    }
}
