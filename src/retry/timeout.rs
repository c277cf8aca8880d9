//! Racing an attempt against a wall-clock deadline.

use std::future::Future;
use std::time::Duration;

use super::error::TimeoutError;

/// Run `future`, failing with [`TimeoutError::Timeout`] if it does not
/// complete within `duration`.
///
/// Wrap the future an operation factory returns to bound every attempt; the
/// retry loop then treats a timeout like any other failed attempt.
///
/// # Examples
///
/// ```rust
/// use retrace::{with_timeout, TimeoutError};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let result = with_timeout(Duration::from_millis(10), async {
///     tokio::time::sleep(Duration::from_secs(10)).await;
///     Ok::<_, String>(42)
/// })
/// .await;
///
/// assert_eq!(
///     result,
///     Err(TimeoutError::Timeout { duration: Duration::from_millis(10) })
/// );
/// # });
/// ```
pub async fn with_timeout<T, E, Fut>(
    duration: Duration,
    future: Fut,
) -> Result<T, TimeoutError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TimeoutError::Inner(e)),
        Err(_) => Err(TimeoutError::Timeout { duration }),
    }
}
