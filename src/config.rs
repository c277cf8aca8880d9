//! Serializable retry and lookup settings.
//!
//! These mirror [`RetryPolicy`] and [`LookupService`](crate::lookup::LookupService)
//! in plain integers so they can live in an app's config file. Missing fields
//! fall back to the defaults AI lookups use.
//!
//! ```rust
//! # #[cfg(feature = "serde")]
//! # fn main() {
//! use retrace::config::LookupConfig;
//!
//! let config: LookupConfig =
//!     serde_json::from_str(r#"{ "retry": { "max_attempts": 5 } }"#).unwrap();
//! assert_eq!(config.retry.max_attempts, 5);
//! assert_eq!(config.retry.base_delay_ms, 1000);
//! assert_eq!(config.request_timeout_secs, 120);
//! # }
//! # #[cfg(not(feature = "serde"))]
//! # fn main() {}
//! ```

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::retry::{
    ConfigError, RetryPolicy, DEFAULT_CAP_DELAY, DEFAULT_JITTER_FRACTION, DEFAULT_MAX_ATTEMPTS,
};

/// Retry policy parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Ceiling on any single pre-jitter delay, in milliseconds.
    pub cap_delay_ms: u64,
    /// Fraction of each delay jitter may add, in `[0, 1]`.
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 1000,
            cap_delay_ms: u64::try_from(DEFAULT_CAP_DELAY.as_millis()).unwrap_or(u64::MAX),
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

impl RetryConfig {
    /// Build a validated policy.
    pub fn into_policy(self) -> Result<RetryPolicy, ConfigError> {
        let policy = RetryPolicy::from(self);
        policy.validate()?;
        Ok(policy)
    }
}

impl From<RetryConfig> for RetryPolicy {
    /// Converts without validating; execution still rejects a bad policy.
    fn from(config: RetryConfig) -> Self {
        RetryPolicy::exponential(Duration::from_millis(config.base_delay_ms))
            .with_max_attempts(config.max_attempts)
            .with_cap_delay(Duration::from_millis(config.cap_delay_ms))
            .with_jitter_fraction(config.jitter_fraction)
    }
}

/// Settings for a [`LookupService`](crate::lookup::LookupService).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LookupConfig {
    /// Retry policy wrapped around each lookup.
    pub retry: RetryConfig,
    /// Wall-clock limit on a single lookup attempt, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout_secs: 120,
        }
    }
}

impl LookupConfig {
    /// The per-attempt timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
