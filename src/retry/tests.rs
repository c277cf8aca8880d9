//! Integration tests for the retry loop.
//!
//! Time is paused, so sleeps resolve instantly and `Instant` measures the
//! virtual time the policy waited.

use super::*;
use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

/// An operation that fails `failures` times, then succeeds.
fn flaky(
    calls: Arc<AtomicU32>,
    failures: u32,
) -> impl FnMut() -> BoxFuture<'static, Result<&'static str, String>> {
    move || {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                Err(format!("transient failure {}", n + 1))
            } else {
                Ok("success")
            }
        }
        .boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_short_circuits() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let result = RetryPolicy::exponential(Duration::from_millis(1000))
        .execute("first-try", flaky(calls.clone(), 0))
        .await;

    assert_eq!(result, Ok("success"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_attempts() {
    for max_attempts in 1..=5 {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryPolicy::exponential(Duration::from_millis(10))
            .with_max_attempts(max_attempts)
            .execute("always-fails", flaky(calls.clone(), u32::MAX))
            .await;

        let err = result.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), max_attempts);
        assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
        assert_eq!(
            err.into_last_error(),
            Some(format!("transient failure {max_attempts}"))
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_eventual_success() {
    for failures in 0..4 {
        let calls = Arc::new(AtomicU32::new(0));

        let result = RetryPolicy::exponential(Duration::from_millis(10))
            .with_max_attempts(4)
            .execute("eventual", flaky(calls.clone(), failures))
            .await;

        assert_eq!(result, Ok("success"));
        assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_exact_backoff_without_jitter() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let result = RetryPolicy::exponential(Duration::from_millis(100))
        .with_max_attempts(5)
        .without_jitter()
        .execute("exact", flaky(calls.clone(), 4))
        .await;

    assert!(result.is_ok());
    // 100 + 200 + 400 + 800
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1500), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1510), "waited {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_cap_limits_each_wait() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let result = RetryPolicy::exponential(Duration::from_secs(100))
        .with_max_attempts(3)
        .without_jitter()
        .execute("capped", flaky(calls.clone(), u32::MAX))
        .await;

    assert!(result.unwrap_err().is_exhausted());
    // 100s, then 200s capped to 120s
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(220), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_millis(220_010), "waited {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_scenario_fails_twice_then_succeeds() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let result = execute(flaky(calls.clone(), 2), 3, Duration::from_millis(1000), "gtin-123").await;

    assert_eq!(result, Ok("success"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(3000), "waited {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(3602), "waited {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_scenario_always_fails() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = execute(
        flaky(calls.clone(), u32::MAX),
        3,
        Duration::from_millis(1000),
        "store-check",
    )
    .await;

    match result {
        Err(RetryError::Exhausted {
            label,
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(label, "store-check");
            assert_eq!(attempts, 3);
            assert_eq!(last_error, "transient failure 3");
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_attempts_fails_fast() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = execute(flaky(calls.clone(), 0), 0, Duration::from_millis(1000), "x").await;

    assert_eq!(result, Err(RetryError::Config(ConfigError::ZeroAttempts)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_jitter_fails_fast() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = RetryPolicy::default()
        .with_jitter_fraction(2.0)
        .execute("x", flaky(calls.clone(), 0))
        .await;

    assert!(result.unwrap_err().is_config());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_counts_as_failed_attempt() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = RetryPolicy::exponential(Duration::from_millis(10))
        .execute("slow-model", {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                with_timeout(Duration::from_secs(60), async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(600)).await;
                    }
                    Ok::<_, String>("categorized")
                })
            }
        })
        .await;

    assert_eq!(result, Ok("categorized"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_every_attempt_timing_out_exhausts() {
    let result = RetryPolicy::exponential(Duration::from_millis(10))
        .execute("hung", || {
            with_timeout(Duration::from_secs(1), async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<(), String>(())
            })
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.attempts(), 3);
    assert!(err.last_error().is_some_and(TimeoutError::is_timeout));
}

#[tokio::test(start_paused = true)]
async fn test_execute_if_aborts_on_non_retryable() {
    #[derive(Debug, PartialEq)]
    enum LookupFailure {
        RateLimited,
        NotFound,
    }

    impl std::fmt::Display for LookupFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    let calls = Arc::new(AtomicU32::new(0));

    let result = RetryPolicy::exponential(Duration::from_millis(10))
        .with_max_attempts(5)
        .execute_if(
            "gtin-999",
            {
                let calls = calls.clone();
                move || {
                    let calls = calls.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err::<(), _>(LookupFailure::RateLimited)
                        } else {
                            Err(LookupFailure::NotFound)
                        }
                    }
                }
            },
            |err| *err == LookupFailure::RateLimited,
        )
        .await;

    assert_eq!(
        result,
        Err(RetryError::Aborted {
            label: "gtin-999".to_string(),
            attempts: 2,
            error: LookupFailure::NotFound,
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hooks_observe_each_retry() {
    let events = Arc::new(Mutex::new(Vec::new()));

    let result = RetryPolicy::exponential(Duration::from_millis(1000))
        .execute_with_hooks("hooked", flaky(Arc::new(AtomicU32::new(0)), 2), {
            let events = events.clone();
            move |event: &RetryEvent<'_, String>| {
                if let Ok(mut events) = events.lock() {
                    events.push((event.label.to_string(), event.attempt, event.next_delay));
                }
            }
        })
        .await;

    assert!(result.is_ok());
    let events = events.lock().map(|e| e.clone()).unwrap_or_default();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, "hooked");
    assert_eq!(events[0].1, 1);
    assert_eq!(events[1].1, 2);
    assert!(events[0].2 >= Duration::from_millis(1000));
    assert!(events[0].2 <= Duration::from_millis(1200));
    assert!(events[1].2 >= Duration::from_millis(2000));
    assert!(events[1].2 <= Duration::from_millis(2400));
}

#[tokio::test(start_paused = true)]
async fn test_every_budget_is_spent_exactly() {
    for budget in 1..=5 {
        let calls = Arc::new(AtomicU32::new(0));
        let hooked = Arc::new(Mutex::new(Vec::new()));

        let err = RetryPolicy::exponential(Duration::from_millis(1))
            .with_max_attempts(budget)
            .execute_with_hooks("budget", flaky(calls.clone(), u32::MAX), {
                let hooked = hooked.clone();
                move |event: &RetryEvent<'_, String>| {
                    if let Ok(mut hooked) = hooked.lock() {
                        hooked.push(event.attempt);
                    }
                }
            })
            .await
            .unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), budget);
        assert_eq!(calls.load(Ordering::SeqCst), budget);
        assert_eq!(
            err.last_error().cloned(),
            Some(format!("transient failure {budget}"))
        );
        let hooked = hooked.lock().map(|h| h.clone()).unwrap_or_default();
        assert_eq!(hooked, (1..budget).collect::<Vec<_>>());
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_hook_after_final_failure() {
    let hook_calls = Arc::new(AtomicU32::new(0));

    let result = RetryPolicy::exponential(Duration::from_millis(1))
        .execute_with_hooks("final", flaky(Arc::new(AtomicU32::new(0)), u32::MAX), {
            let hook_calls = hook_calls.clone();
            move |_: &RetryEvent<'_, String>| {
                hook_calls.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let calls = Arc::new(AtomicU32::new(0));
    let token = CancellationToken::new();
    let start = Instant::now();

    tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            token.cancel();
        }
    });

    let result = RetryPolicy::exponential(Duration::from_millis(1000))
        .execute_with_cancel("abandoned", &token, flaky(calls.clone(), u32::MAX))
        .await;

    match result {
        Err(RetryError::Cancelled {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 1);
            assert_eq!(last_error.as_deref(), Some("transient failure 1"));
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_attempt() {
    let token = CancellationToken::new();

    tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            token.cancel();
        }
    });

    let result = RetryPolicy::default()
        .execute_with_cancel("in-flight", &token, || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(())
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.attempts(), 1);
    assert!(err.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_never_invokes() {
    let calls = Arc::new(AtomicU32::new(0));
    let token = CancellationToken::new();
    token.cancel();

    let result = RetryPolicy::default()
        .execute_with_cancel("gone", &token, flaky(calls.clone(), 0))
        .await;

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_uncancelled_token_behaves_like_execute() {
    let calls = Arc::new(AtomicU32::new(0));
    let token = CancellationToken::new();

    let result = RetryPolicy::exponential(Duration::from_millis(10))
        .execute_with_cancel("kept", &token, flaky(calls.clone(), 2))
        .await;

    assert_eq!(result, Ok("success"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sessions_are_independent() {
    let policy = RetryPolicy::exponential(Duration::from_millis(100)).without_jitter();
    let fast = Arc::new(AtomicU32::new(0));
    let slow = Arc::new(AtomicU32::new(0));

    let (a, b) = tokio::join!(
        policy.execute("a", flaky(fast.clone(), 0)),
        policy.execute("b", flaky(slow.clone(), u32::MAX)),
    );

    assert_eq!(a, Ok("success"));
    assert_eq!(b.unwrap_err().attempts(), 3);
    assert_eq!(fast.load(Ordering::SeqCst), 1);
    assert_eq!(slow.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_intermediate_failures_are_logged() {
    let result = execute(
        flaky(Arc::new(AtomicU32::new(0)), 2),
        3,
        Duration::from_millis(10),
        "gtin-123",
    )
    .await;

    assert!(result.is_ok());
    assert!(logs_contain("attempt failed, retrying"));
    assert!(logs_contain("gtin-123"));
    assert!(logs_contain("transient failure 1"));
    assert!(logs_contain("transient failure 2"));
    assert!(logs_contain("attempt=1"));
    assert!(logs_contain("attempt=2"));
    assert!(logs_contain("max_attempts=3"));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_exhaustion_is_logged() {
    let _ = execute(
        flaky(Arc::new(AtomicU32::new(0)), u32::MAX),
        2,
        Duration::from_millis(10),
        "store-check",
    )
    .await;

    assert!(logs_contain("retry budget exhausted"));
    assert!(logs_contain("store-check"));
}
