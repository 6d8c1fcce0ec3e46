//! tessera-cli: scripted access to the content API through the cached client.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod print;

use clap::Parser;
use tracing::debug;

use args::{Cli, Commands};
use client::{CliError, build_client, load_settings};
use handlers::{chat, items, members, tags};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    tessera::telemetry::init(&settings.logging)?;
    let client = build_client(&settings)?;
    debug!(host = %settings.api.host, "CLI settings loaded");

    match cli.command {
        Commands::Items(cmd) => items::handle(&client, cmd.action).await?,
        Commands::Members(cmd) => members::handle(&client, cmd.action).await?,
        Commands::Chat(cmd) => chat::handle(&client, cmd.action).await?,
        Commands::Tags(cmd) => tags::handle(&client, cmd.action).await?,
    }

    Ok(())
}
