//! Retry with bounded, jittered exponential backoff.
//!
//! - **Policy**: [`RetryPolicy`] is plain data: attempt budget, base delay,
//!   cap and jitter fraction. It computes the schedule but never sleeps.
//! - **Execution**: `RetryPolicy::execute*` drive a caller-supplied operation
//!   factory through [`RetryState`], logging every failed attempt.
//! - **Composition**: [`with_timeout`] bounds a single attempt; a timeout is
//!   just another failure to the loop.
//!
//! # Quick Start
//!
//! ```rust
//! use retrace::RetryPolicy;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::exponential(Duration::from_millis(10))
//!     .with_max_attempts(3);
//!
//! let result = policy
//!     .execute("gtin-123", || async { Ok::<_, String>(42) })
//!     .await;
//!
//! assert_eq!(result, Ok(42));
//! # });
//! ```
//!
//! # Backoff
//!
//! The wait before retry `n` (0 for the first retry) is
//! `min(base * 2^n, cap) * (1 + U[0, 1) * jitter_fraction)`. With the
//! defaults (cap 120s, jitter 0.2) and a one second base, three attempts
//! wait roughly 1.0-1.2s and then 2.0-2.4s.
//!
//! # Error Types
//!
//! - [`RetryError`]: terminal outcome of a session; `Exhausted` carries the
//!   final error unmodified
//! - [`ConfigError`]: the policy was rejected before running
//! - [`TimeoutError`]: returned by [`with_timeout`]

mod error;
mod executor;
mod policy;
mod state;
mod timeout;

pub use error::{ConfigError, RetryError, TimeoutError};
pub use executor::{execute, RetryEvent};
pub(crate) use executor::run;
pub use policy::{RetryPolicy, DEFAULT_CAP_DELAY, DEFAULT_JITTER_FRACTION, DEFAULT_MAX_ATTEMPTS};
pub use state::RetryState;
pub use timeout::with_timeout;

#[cfg(test)]
mod tests;
