//! Unit tests for the retry executor: attempt bounds, classification,
//! and pass-through of non-retryable failures.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use recordkeeper::persistence::executor::{is_transient, retry, retry_if, RetryPolicy};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay: Duration::from_millis(1),
    }
}

#[test]
fn default_policy_is_three_attempts_one_second_apart() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.delay, Duration::from_secs(1));
}

#[tokio::test]
async fn success_passes_through_on_first_attempt() {
    let calls = AtomicU32::new(0);

    let result = retry(&fast_policy(3), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, sqlx::Error>(7) }
    })
    .await;

    assert_eq!(result.expect("first attempt succeeds"), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_failures_retry_up_to_the_attempt_bound() {
    let calls = AtomicU32::new(0);

    let result = retry(&fast_policy(3), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(sqlx::Error::PoolTimedOut) }
    })
    .await;

    assert!(result.is_err(), "persistent failure still fails");
    assert_eq!(
        calls.load(Ordering::SeqCst),
        3,
        "max_attempts bounds the total calls, including the first"
    );
}

#[tokio::test]
async fn recovers_when_a_later_attempt_succeeds() {
    let calls = AtomicU32::new(0);

    let result = retry(&fast_policy(3), || {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if attempt < 2 {
                Err(sqlx::Error::PoolTimedOut)
            } else {
                Ok(attempt)
            }
        }
    })
    .await;

    assert_eq!(result.expect("second attempt succeeds"), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_transient_error_propagates_without_retry() {
    let calls = AtomicU32::new(0);

    let result = retry(&fast_policy(3), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(sqlx::Error::RowNotFound) }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "non-transient failures must not burn retry attempts"
    );
}

#[tokio::test]
async fn classifier_gates_which_errors_retry() {
    let calls = AtomicU32::new(0);

    // Protocol errors are transient for `retry`, but this classifier only
    // retries pool timeouts, so the protocol error propagates at once.
    let result = retry_if(
        &fast_policy(3),
        |err: &sqlx::Error| matches!(err, sqlx::Error::PoolTimedOut),
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(sqlx::Error::Protocol("desync".into())) }
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn single_attempt_policy_runs_exactly_once() {
    let calls = AtomicU32::new(0);

    let result = retry(&fast_policy(1), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(sqlx::Error::PoolTimedOut) }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_attempt_policy_still_runs_once() {
    let calls = AtomicU32::new(0);

    let result = retry(&fast_policy(0), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, sqlx::Error>(()) }
    })
    .await;

    assert!(result.is_ok(), "a zero bound is clamped, not a no-op");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ── Transience classification ────────────────────────

#[test]
fn transport_failures_are_transient() {
    let io = sqlx::Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    ));
    assert!(is_transient(&io));
    assert!(is_transient(&sqlx::Error::PoolTimedOut));
    assert!(is_transient(&sqlx::Error::PoolClosed));
    assert!(is_transient(&sqlx::Error::Protocol("stream desync".into())));
}

#[test]
fn data_and_usage_errors_are_not_transient() {
    assert!(!is_transient(&sqlx::Error::RowNotFound));
    assert!(!is_transient(&sqlx::Error::ColumnNotFound(
        "full_name".into()
    )));
}
