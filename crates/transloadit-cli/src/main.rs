//! `transloadit` command: create assemblies, look them up, cancel them.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{handle_cancel, handle_create, handle_status};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transloadit::Transloadit;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let client = Transloadit::from_env()?;

    let result = match cli.command {
        Commands::Create { args } => handle_create(&client, args).await,
        Commands::Status { assembly_id, wait } => handle_status(&client, &assembly_id, wait).await,
        Commands::Cancel { assembly_id } => handle_cancel(&client, &assembly_id).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "command failed");
    }
    result
}
