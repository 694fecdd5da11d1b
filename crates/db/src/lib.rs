//! Database client factory and schema bootstrap.
//!
//! [`Database`] is constructed once at startup and handed to whatever needs
//! storage; it is cheap to clone and shares a single connection pool.

use std::{str::FromStr, time::Duration};

use anyhow::Context;
use bookstore_kernel::{
    settings::{DatabaseDriver, DatabaseSettings},
    Migration,
};
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::AnyPool;

/// Shared handle to the relational store.
#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
    driver: DatabaseDriver,
}

impl Database {
    /// Open a connection pool for the configured database.
    ///
    /// Failure here is fatal for the process; there is no per-request retry.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let url = settings.connection_url()?;
        Self::open(
            &url,
            settings.driver,
            settings.max_connections,
            Duration::from_millis(settings.acquire_timeout_ms),
        )
        .await
    }

    /// Single-connection in-memory SQLite database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::open(
            "sqlite::memory:",
            DatabaseDriver::Sqlite,
            1,
            Duration::from_secs(5),
        )
        .await
    }

    async fn open(
        url: &str,
        driver: DatabaseDriver,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> anyhow::Result<Self> {
        sqlx::any::install_default_drivers();

        let options = AnyConnectOptions::from_str(url)
            .with_context(|| format!("invalid {:?} connection url", driver))?;

        let mut pool_options = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(acquire_timeout);
        if is_in_memory(url) {
            // Every in-memory SQLite connection is its own database; keep
            // exactly one alive for the lifetime of the pool.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to {:?} database", driver))?;

        tracing::info!(target: "bookstore-db", driver = ?driver, "database pool ready");

        Ok(Self { pool, driver })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn driver(&self) -> DatabaseDriver {
        self.driver
    }

    /// Apply module migrations in the given order.
    ///
    /// Statements are idempotent (`CREATE TABLE IF NOT EXISTS`), so running
    /// this on every startup is safe. No migration history is kept.
    pub async fn migrate(&self, migrations: &[(String, Migration)]) -> anyhow::Result<()> {
        for (module, migration) in migrations {
            for statement in migration.statements(self.driver) {
                sqlx::query(statement)
                    .execute(&self.pool)
                    .await
                    .with_context(|| {
                        format!("migration {}/{} failed", module, migration.id)
                    })?;
            }

            tracing::info!(
                target: "bookstore-db",
                module = %module,
                migration = migration.id,
                "migration applied"
            );
        }

        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(url: &str) -> bool {
    url.starts_with("sqlite::memory:") || url.contains("mode=memory")
}
