//! Postgres connection and schema helpers shared by the SQL backends.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed, Io, Tls, ... | n/a | `Backend` |

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::store::{StoreError, StoreResult};

const SCHEMA: &str = include_str!("../migrations/0001_schema.sql");

/// Open a pool against `url`.
pub async fn connect(url: &str, max_connections: u32) -> StoreResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Apply the embedded schema. Safe to run on every start.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    tracing::info!("database schema is up to date");
    Ok(())
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(constraint),
                Some("23503") => StoreError::ForeignKeyViolation(constraint),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

/// Decode a text column into one of the domain enums.
pub(crate) fn parse_column<T>(column: &str, raw: &str) -> StoreResult<T>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse()
        .map_err(|e| StoreError::Backend(format!("corrupt {column} value '{raw}': {e}")))
}
