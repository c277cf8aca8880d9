//! The lookup service: one retry session per GTIN, each attempt bounded by a
//! timeout.

use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Gtin, LookupError, ProductLookup, ProductSuggestion};
use crate::config::LookupConfig;
use crate::retry::{run, with_timeout, ConfigError, RetryEvent, RetryPolicy, TimeoutError};

/// Runs GTIN lookups against an injected client with retries and a
/// per-attempt timeout.
///
/// Each call is an independent retry session; one service can be shared by
/// any number of concurrent requests.
///
/// # Examples
///
/// ```rust
/// use retrace::lookup::{Gtin, LookupService, ProductLookup, ProductSuggestion};
///
/// struct Catalogue;
///
/// impl ProductLookup for Catalogue {
///     type Error = String;
///
///     async fn suggest(&self, gtin: &Gtin) -> Result<ProductSuggestion, String> {
///         Ok(ProductSuggestion {
///             title: format!("Item {gtin}"),
///             ..ProductSuggestion::default()
///         })
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let service = LookupService::new(Catalogue);
/// let product = service.lookup("4006381333931").await.unwrap();
/// assert_eq!(product.title, "Item 4006381333931");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct LookupService<C> {
    client: C,
    policy: RetryPolicy,
    request_timeout: Duration,
}

impl<C: ProductLookup> LookupService<C> {
    /// Wrap `client` with the default policy (3 attempts from one second)
    /// and a 120 second per-attempt timeout.
    pub fn new(client: C) -> Self {
        Self::with_settings(
            client,
            RetryPolicy::default(),
            LookupConfig::default().request_timeout(),
        )
    }

    /// Wrap `client` with settings from config.
    pub fn from_config(client: C, config: LookupConfig) -> Result<Self, ConfigError> {
        let timeout = config.request_timeout();
        let policy = config.retry.into_policy()?;
        Ok(Self::with_settings(client, policy, timeout))
    }

    fn with_settings(client: C, policy: RetryPolicy, request_timeout: Duration) -> Self {
        Self {
            client,
            policy,
            request_timeout,
        }
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the per-attempt timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The injected client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Look up one GTIN.
    pub async fn lookup(&self, gtin: &str) -> Result<ProductSuggestion, LookupError> {
        self.lookup_inner(gtin, None).await
    }

    /// Look up one GTIN, giving up as soon as `cancel` fires.
    pub async fn lookup_with_cancel(
        &self,
        gtin: &str,
        cancel: &CancellationToken,
    ) -> Result<ProductSuggestion, LookupError> {
        self.lookup_inner(gtin, Some(cancel)).await
    }

    /// Look up several GTINs concurrently. Results keep the input order.
    pub async fn lookup_many<S: AsRef<str>>(
        &self,
        gtins: &[S],
    ) -> Vec<Result<ProductSuggestion, LookupError>> {
        join_all(gtins.iter().map(|gtin| self.lookup(gtin.as_ref()))).await
    }

    async fn lookup_inner(
        &self,
        input: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<ProductSuggestion, LookupError> {
        let gtin = Gtin::parse(input).map_err(|reason| LookupError::InvalidGtin {
            input: input.to_owned(),
            reason,
        })?;
        let label = format!("gtin-{gtin}");

        let client = &self.client;
        let target = &gtin;
        let timeout = self.request_timeout;

        let result = run(
            &self.policy,
            &label,
            move || with_timeout(timeout, client.suggest(target)),
            |err: &TimeoutError<C::Error>| match err {
                TimeoutError::Timeout { .. } => true,
                TimeoutError::Inner(inner) => C::is_retryable(inner),
            },
            |_: &RetryEvent<'_, TimeoutError<C::Error>>| {},
            cancel,
        )
        .await;

        match result {
            Ok(product) => {
                debug!(%gtin, title = %product.title, "lookup succeeded");
                Ok(product)
            }
            Err(err) => Err(LookupError::from_retry(gtin.as_str(), err)),
        }
    }
}
