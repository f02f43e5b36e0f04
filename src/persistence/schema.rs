//! Schema bootstrap for the person aggregate tables.
//!
//! Startup runs only additive `CREATE ... IF NOT EXISTS` statements, so
//! re-running on every boot converges without touching existing rows.
//! Destructive recreation exists solely as an explicit operator action.

use sqlx::Executor as _;
use sqlx::PgConnection;
use tracing::{info, warn};

use crate::Result;

use super::executor::Executor;

const SCHEMA_DDL: &str = r"
CREATE TABLE IF NOT EXISTS persons (
    id                BIGSERIAL PRIMARY KEY,
    full_name         TEXT NOT NULL,
    father_name       TEXT NOT NULL,
    mother_name       TEXT NOT NULL,
    date_of_birth     DATE NOT NULL,
    gender            TEXT NOT NULL CHECK(gender IN ('male','female','other')),
    national_id       TEXT NOT NULL,
    voter_number      TEXT,
    permanent_address TEXT NOT NULL,
    present_address   TEXT NOT NULL,
    profile_image     JSONB,
    description       TEXT,
    created_at        TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS contact_info (
    id         BIGSERIAL PRIMARY KEY,
    person_id  BIGINT NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
    kind       TEXT NOT NULL CHECK(kind IN ('mobile','whatsapp','facebook','website')),
    value      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id         BIGSERIAL PRIMARY KEY,
    person_id  BIGINT NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
    url        TEXT NOT NULL,
    kind       TEXT NOT NULL CHECK(kind IN ('pdf'))
);

CREATE INDEX IF NOT EXISTS idx_contact_info_person ON contact_info(person_id);
CREATE INDEX IF NOT EXISTS idx_documents_person ON documents(person_id);
CREATE INDEX IF NOT EXISTS idx_persons_created ON persons(created_at DESC);
";

const DROP_DDL: &str = r"
DROP TABLE IF EXISTS documents;
DROP TABLE IF EXISTS contact_info;
DROP TABLE IF EXISTS persons;
";

/// Apply all table definitions idempotently. Safe to call on every startup.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails; the caller treats
/// that as fatal.
pub async fn ensure_schema(executor: &Executor) -> Result<()> {
    executor
        .run(|conn| Box::pin(apply_ddl(conn, SCHEMA_DDL)))
        .await?;
    info!("database schema ensured");
    Ok(())
}

/// Drop all three tables and recreate them empty.
///
/// Every stored record is lost. Reachable only through the operator CLI,
/// never from the normal startup path.
///
/// # Errors
///
/// Returns `AppError::Db` if the drop or the subsequent recreation fails.
pub async fn reset_schema(executor: &Executor) -> Result<()> {
    warn!("dropping all record tables at operator request");
    executor
        .run(|conn| Box::pin(apply_ddl(conn, DROP_DDL)))
        .await?;
    ensure_schema(executor).await
}

async fn apply_ddl(conn: &mut PgConnection, ddl: &'static str) -> sqlx::Result<()> {
    // The trait method returns a boxed future, which keeps the closure
    // passed to `Executor::run` valid for every connection lifetime.
    conn.execute(sqlx::raw_sql(ddl)).await?;
    Ok(())
}
