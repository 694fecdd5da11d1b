use anyhow::Context;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Command-line entrypoint for the bookstore service
#[derive(Debug, Parser)]
#[command(name = "bookstore-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect, apply migrations and serve the HTTP API (default)
    Serve,
    /// Apply migrations and exit
    Migrate,
    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings.redacted())
                .context("failed to render settings")?;
            println!("{}", rendered);
            Ok(())
        }
        Command::Migrate => {
            bookstore_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "running migrations");
            bookstore::app::migrate(&settings).await
        }
        Command::Serve => {
            bookstore_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookstore starting");
            bookstore::app::serve(&settings).await
        }
    }
}
