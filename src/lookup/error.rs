//! Lookup failures and their user-facing rendering.

use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::Serialize;
use thiserror::Error;

use super::gtin::GtinError;
use crate::retry::{ConfigError, RetryError};

/// Errors surfaced by [`LookupService`](super::LookupService).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// The input was not a valid GTIN; no lookup was attempted.
    #[error("invalid GTIN `{input}`: {reason}")]
    InvalidGtin {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        #[source]
        reason: GtinError,
    },

    /// Every attempt failed.
    #[error("lookup for {gtin} failed after {attempts} attempts: {message}")]
    Failed {
        /// The GTIN being looked up.
        gtin: String,
        /// Attempts made.
        attempts: u32,
        /// Message of the last underlying error.
        message: String,
    },

    /// The client reported an error it does not want retried.
    #[error("lookup for {gtin} was rejected: {message}")]
    Rejected {
        /// The GTIN being looked up.
        gtin: String,
        /// Message of the underlying error.
        message: String,
    },

    /// The caller abandoned the lookup.
    #[error("lookup for {gtin} was cancelled")]
    Cancelled {
        /// The GTIN being looked up.
        gtin: String,
    },

    /// The service was built with an invalid retry policy.
    #[error("lookup service misconfigured: {0}")]
    Config(#[from] ConfigError),
}

impl LookupError {
    pub(crate) fn from_retry<E: Display>(gtin: &str, err: RetryError<E>) -> Self {
        let gtin = gtin.to_owned();
        match err {
            RetryError::Config(err) => Self::Config(err),
            RetryError::Exhausted {
                attempts,
                last_error,
                ..
            } => Self::Failed {
                gtin,
                attempts,
                message: last_error.to_string(),
            },
            RetryError::Aborted { error, .. } => Self::Rejected {
                gtin,
                message: error.to_string(),
            },
            RetryError::Cancelled { .. } => Self::Cancelled { gtin },
        }
    }

    /// HTTP status a route handler should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidGtin { .. } => 400,
            Self::Cancelled { .. } => 499,
            Self::Failed { .. } | Self::Rejected { .. } => 502,
            Self::Config(_) => 500,
        }
    }

    /// The JSON body a route handler should answer with.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

/// `{"error": "..."}` response body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}
