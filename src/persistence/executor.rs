//! Transactional execution with bounded retry of transient failures.
//!
//! Every database operation in the application flows through [`Executor::run`]:
//! acquire a pooled connection, open a transaction, run the unit of work,
//! commit. Transient connectivity failures roll back and retry the whole
//! sequence; anything else rolls back and propagates immediately. No other
//! module talks to the pool directly.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use futures_util::future::BoxFuture;
use sqlx::{PgConnection, PgPool};
use tracing::warn;

use crate::Result;

/// Attempt bound and inter-attempt delay for retryable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Classify an error as a transient connectivity failure worth retrying.
///
/// Covers client-side transport failures (I/O, TLS, protocol, pool
/// exhaustion or shutdown) and server-reported connection exceptions:
/// SQLSTATE class 08, `57P01` (admin shutdown), `57P03` (cannot connect
/// now). Constraint and data errors are never transient.
#[must_use]
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code.starts_with("08") || code == "57P01" || code == "57P03"),
        _ => false,
    }
}

/// Drive `op` to success or a non-retryable failure, bounded by `policy`.
///
/// Calls `op` up to `policy.max_attempts` times total, sleeping
/// `policy.delay` between attempts while `is_retryable` holds. The last
/// attempt's error propagates whether or not it was retryable.
///
/// # Errors
///
/// Returns the first non-retryable error, or the final error once the
/// attempt bound is exhausted.
pub async fn retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    for attempt in 1..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) => {
                warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "retryable failure, pausing before next attempt"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
    op().await
}

/// [`retry_if`] specialized to transient database connectivity failures.
///
/// # Errors
///
/// Returns the first non-transient error, or the final error once the
/// attempt bound is exhausted.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, op: F) -> sqlx::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = sqlx::Result<T>>,
{
    retry_if(policy, is_transient, op).await
}

/// Single choke point for transactional database work.
#[derive(Debug, Clone)]
pub struct Executor {
    pool: PgPool,
    policy: RetryPolicy,
}

impl Executor {
    /// Wrap a pool with the given retry policy.
    #[must_use]
    pub fn new(pool: PgPool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    /// Run one unit of work inside its own transaction.
    ///
    /// The closure receives the transaction's connection and is re-invoked
    /// from scratch on each retry; it must be side-effect free outside the
    /// database. Commit happens only after the closure succeeds; on any
    /// failure the transaction rolls back when dropped and the connection
    /// returns to the pool either way.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` when the work or the commit fails after the
    /// retry bound, or immediately for non-transient failures.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: for<'c> Fn(&'c mut PgConnection) -> BoxFuture<'c, sqlx::Result<T>> + Send + Sync,
    {
        let value = retry(&self.policy, || self.run_once(&op)).await?;
        Ok(value)
    }

    async fn run_once<T, F>(&self, op: &F) -> sqlx::Result<T>
    where
        F: for<'c> Fn(&'c mut PgConnection) -> BoxFuture<'c, sqlx::Result<T>>,
    {
        let mut tx = self.pool.begin().await?;
        let value = op(&mut *tx).await?;
        tx.commit().await?;
        Ok(value)
    }
}
