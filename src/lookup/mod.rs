//! AI-assisted product lookups by GTIN.
//!
//! The lookup client is injected: anything implementing [`ProductLookup`]
//! (a hosted model, a catalogue API, a test double) is handed to
//! [`LookupService::new`], which drives it through a [`RetryPolicy`]
//! with a per-attempt timeout.
//!
//! [`RetryPolicy`]: crate::RetryPolicy

mod error;
mod gtin;
mod service;

use std::future::Future;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use error::{ErrorBody, LookupError};
pub use gtin::{Gtin, GtinError};
pub use service::LookupService;

/// Product details suggested for a GTIN.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProductSuggestion {
    /// Product title.
    pub title: String,
    /// Shopify product type / category.
    pub product_type: String,
    /// Brand or manufacturer, if known.
    pub vendor: Option<String>,
    /// Search tags.
    pub tags: Vec<String>,
    /// Description, already rendered to HTML.
    pub description_html: String,
}

/// A client that can suggest product details for a GTIN.
///
/// Calls may be repeated by the retry policy, so implementations should be
/// free of side effects, or report errors raised after a side effect through
/// [`ProductLookup::is_retryable`].
pub trait ProductLookup: Send + Sync {
    /// Error returned by a single call.
    type Error: std::fmt::Display + Send;

    /// Look up one GTIN.
    fn suggest(
        &self,
        gtin: &Gtin,
    ) -> impl Future<Output = Result<ProductSuggestion, Self::Error>> + Send;

    /// Whether a failed call may be repeated. Defaults to always.
    fn is_retryable(_error: &Self::Error) -> bool {
        true
    }
}
