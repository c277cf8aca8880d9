//! # Retrace
//!
//! Bounded, jittered exponential-backoff retries for the async calls a
//! Shopify admin app makes to AI and catalogue services.
//!
//! ## Model
//!
//! - A [`RetryPolicy`] is plain data: attempt budget, base delay, cap and
//!   jitter fraction.
//! - `RetryPolicy::execute*` runs an operation factory through
//!   [`RetryState`], logging every failed attempt with `tracing`, and yields
//!   either the first success or a [`RetryError`] that keeps the last
//!   underlying error intact.
//! - [`with_timeout`] bounds a single attempt, and a `CancellationToken`
//!   stops a session that nobody is waiting for anymore.
//!
//! ## Quick Example
//!
//! ```rust
//! use retrace::{execute, RetryError};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let result: Result<u32, RetryError<String>> = execute(
//!     || async { Ok(7) },
//!     3,
//!     Duration::from_millis(1000),
//!     "gtin-4006381333931",
//! )
//! .await;
//!
//! assert_eq!(result, Ok(7));
//! # });
//! ```
//!
//! The [`lookup`] module shows the policy wired into a GTIN lookup service
//! with an injected client.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod lookup;
pub mod retry;

// Re-exports
pub use config::{LookupConfig, RetryConfig};
pub use retry::{
    execute, with_timeout, ConfigError, RetryError, RetryEvent, RetryPolicy, RetryState,
    TimeoutError,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::lookup::{LookupService, ProductLookup};
    pub use crate::retry::{execute, with_timeout, RetryError, RetryPolicy, TimeoutError};
}
