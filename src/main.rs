use anyhow::Result;
use clap::{Parser, Subcommand};
use keyauth_core::{config::Config, migration, server, telemetry};
use tracing::info;

/// KeyAuth Core - multi-tenant identity and organization service
#[derive(Parser)]
#[command(name = "keyauth-core")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
    /// Start the HTTP server (default)
    #[default]
    Serve,
    /// Create the database if needed and apply migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let metrics_handle = telemetry::init(&config.telemetry)?;

    match cli.command.unwrap_or_default() {
        Command::Serve => {
            info!("Starting KeyAuth Core on {}", config.http_addr());
            server::run(config, metrics_handle).await
        }
        Command::Migrate => migration::run_migrations(&config).await,
    }
}
