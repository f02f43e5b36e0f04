//! `PostgreSQL` connection pool construction.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::Result;

use super::executor::{retry_if, RetryPolicy};

/// Establish the connection pool, retrying initial establishment.
///
/// Unlike steady-state operations, *any* establishment failure is retried
/// here (bad credentials included); the server may simply not be up yet.
/// After the attempt bound (3 attempts, 1 second apart) the last error
/// surfaces and the caller treats it as fatal.
///
/// # Errors
///
/// Returns `AppError::Config` for an unrecognized `ssl_mode` and
/// `AppError::Db` when every establishment attempt fails.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let options = connect_options(config)?;
    let policy = RetryPolicy::default();
    let pool = retry_if(&policy, |_| true, || {
        pool_options(config).connect_with(options.clone())
    })
    .await?;
    info!(
        host = %config.host,
        database = %config.database,
        min = config.min_connections,
        max = config.max_connections,
        "database pool established"
    );
    Ok(pool)
}

/// Build a pool without contacting the server; connections open on first
/// use. Suited to callers that may never touch the database.
///
/// # Errors
///
/// Returns `AppError::Config` for an unrecognized `ssl_mode`.
pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool> {
    Ok(pool_options(config).connect_lazy_with(connect_options(config)?))
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .ssl_mode(config.ssl_mode()?))
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
}
