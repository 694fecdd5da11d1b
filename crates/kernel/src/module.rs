use async_trait::async_trait;
use axum::Router;

use crate::settings::DatabaseDriver;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Idempotent schema statements contributed by a module.
///
/// Each dialect gets its own statement list; every statement must be safe to
/// run against a database that already has the schema.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub mysql: &'static [&'static str],
    pub sqlite: &'static [&'static str],
}

impl Migration {
    /// Statements to execute for the given driver, in order.
    pub fn statements(&self, driver: DatabaseDriver) -> &'static [&'static str] {
        match driver {
            DatabaseDriver::Mysql => self.mysql,
            DatabaseDriver::Sqlite => self.sqlite,
        }
    }
}

/// Core module trait that all application modules implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup after migrations
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes.
    /// Routes carry their full paths and are merged into the root router.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Return migrations contributed by this module
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Start background work for this module
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_follow_the_driver() {
        let migration = Migration {
            id: "001_init",
            mysql: &["CREATE TABLE IF NOT EXISTS t (id BIGINT)"],
            sqlite: &["CREATE TABLE IF NOT EXISTS t (id INTEGER)"],
        };

        assert_eq!(
            migration.statements(DatabaseDriver::Sqlite),
            &["CREATE TABLE IF NOT EXISTS t (id INTEGER)"]
        );
        assert_eq!(
            migration.statements(DatabaseDriver::Mysql),
            &["CREATE TABLE IF NOT EXISTS t (id BIGINT)"]
        );
    }
}
