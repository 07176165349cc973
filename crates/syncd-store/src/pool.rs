//! Database connection pool management.
//!
//! A thin wrapper around SQLx's `SqlitePool`: WAL journal mode for
//! concurrent reads, automatic schema migration on first connection, and
//! an in-memory mode for tests.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use syncd_core::ports::StoreError;

/// Owns the `SqlitePool` backing [`crate::SqliteStore`].
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if missing) the database file at `db_path` and
    /// runs migrations.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Backend(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::Backend(format!(
                    "failed to connect to database at {}: {e}",
                    db_path.display()
                ))
            })?;

        Self::run_migrations(&pool).await?;
        tracing::info!(path = %db_path.display(), "database pool initialized");
        Ok(Self { pool })
    }

    /// A single-connection in-memory pool, used by tests (SQLite
    /// in-memory databases are per-connection, so the pool must not hand
    /// out more than one).
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Backend(format!("failed to create in-memory database: {e}")))?;

        Self::run_migrations(&pool).await?;
        tracing::debug!("in-memory database pool initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        let migration_sql = include_str!("migrations/20260203_initial.sql");
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to run initial migration: {e}")))?;
        tracing::debug!("database migrations completed");
        Ok(())
    }
}
