//! Backend-neutral connection handle (spec.md §4.3).
//!
//! `sqlx::AnyPool` gives one connection/row type for both SQLite and
//! Postgres; `Db` layers the `?`-placeholder rewrite (`super::placeholder`)
//! on top so every repository issues the same SQL string regardless of
//! which backend is configured. Schema setup runs as one multi-statement
//! `raw_sql` batch against that same pool (`sqlx::migrate::Migrate` isn't
//! implemented for `Any`, and a separate concrete-backend connection would
//! miss `sqlite::memory:`'s single ephemeral database entirely).

use crate::error::PersistenceError;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};

#[derive(Clone)]
pub struct Db {
    pool: AnyPool,
    is_postgres: bool,
}

impl Db {
    pub async fn connect(database_url: &str) -> Result<Db, PersistenceError> {
        sqlx::any::install_default_drivers();
        // A bare `sqlite::memory:` opens a fresh, empty database per
        // connection; pinning the pool to one connection keeps every query
        // against the same backing store (needed for the "in-memory" mode
        // SPACETRADERS_DB_PATH supports, spec.md §6, and for tests).
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Db {
            pool,
            is_postgres: database_url.starts_with("postgres"),
        })
    }

    /// Applies `migrations/0001_init.sql` (`CREATE TABLE IF NOT EXISTS`
    /// throughout, so this is safe to call on every startup) against this
    /// pool's backend.
    pub async fn apply_schema(&self) -> Result<(), PersistenceError> {
        const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        Ok(())
    }

    /// True once the pool has been shut down (spec.md §4.6 "database-closed
    /// graceful shutdown" — `Runtime::isClosed`).
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Closes the pool, marking it `is_closed` for in-flight container
    /// tasks polling that flag (spec.md §4.6 "database-closed graceful
    /// shutdown").
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub(crate) fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Rewrites a `?`-dialect statement for the active backend. A no-op on
    /// SQLite.
    pub(crate) fn sql(&self, statement: &str) -> String {
        if self.is_postgres {
            super::placeholder::to_postgres(statement)
        } else {
            statement.to_string()
        }
    }
}

pub(crate) fn get_str(row: &AnyRow, col: &str) -> Result<String, PersistenceError> {
    row.try_get::<String, _>(col)
        .map_err(|e| PersistenceError::Query(e.to_string()))
}

pub(crate) fn get_opt_str(row: &AnyRow, col: &str) -> Result<Option<String>, PersistenceError> {
    row.try_get::<Option<String>, _>(col)
        .map_err(|e| PersistenceError::Query(e.to_string()))
}

pub(crate) fn get_i64(row: &AnyRow, col: &str) -> Result<i64, PersistenceError> {
    row.try_get::<i64, _>(col)
        .map_err(|e| PersistenceError::Query(e.to_string()))
}
