//! Process bootstrap shared by the `bookstore` binary and the CLI.

use anyhow::Context;
use bookstore_db::Database;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// Registry with every application module wired to `db`
pub fn build_registry(db: &Database) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db);
    registry
}

/// Open the database and apply module migrations.
///
/// A database that cannot be opened is fatal for the process.
pub async fn prepare(settings: &Settings) -> anyhow::Result<(Database, ModuleRegistry)> {
    let db = Database::connect(&settings.database)
        .await
        .context("failed to open the database")?;

    let registry = build_registry(&db);
    db.migrate(&registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;

    Ok((db, registry))
}

/// Apply migrations and exit.
pub async fn migrate(settings: &Settings) -> anyhow::Result<()> {
    let (db, registry) = prepare(settings).await?;
    tracing::info!(
        migrations = registry.collect_migrations().len(),
        "schema is up to date"
    );
    db.close().await;
    Ok(())
}

/// Run the HTTP service until a shutdown signal arrives.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let (db, registry) = prepare(settings).await?;
    let ctx = InitCtx { settings };

    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = bookstore_http::start_server(&registry, settings).await;

    registry.stop_modules().await?;
    db.close().await;

    served
}
