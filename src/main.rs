mod app;
mod broadcaster;
mod cli;
mod config;
mod encoding;
mod error;
mod registry;
mod render;
mod state;
mod watcher;
mod web;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Exits with a usage error when --input is missing, before anything binds.
    let cli = Cli::parse();
    init_tracing(cli.get_tracing_level());

    let config = cli.into_config()?;
    app::run(config).await?;
    Ok(())
}

fn init_tracing(level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
