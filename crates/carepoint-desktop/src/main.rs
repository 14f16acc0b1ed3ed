use clap::Parser;
use eyre::Result;
use tracing_subscriber::EnvFilter;

use carepoint_desktop::commands::{self, Cli, Desktop};
use carepoint_desktop::config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    color_eyre::install()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // CAREPOINT_LOG=json switches to structured lines for log shipping.
    if std::env::var("CAREPOINT_LOG").is_ok_and(|v| v == "json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = config::load_or_init()?;
    let desktop = Desktop::open(config)?;

    let mut stdout = std::io::stdout().lock();
    commands::run(cli.command, &desktop, &mut stdout).await
}
