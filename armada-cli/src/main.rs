//! Armada CLI
//!
//! Command-line interface for sending Tekton jobs to a minion by hand and for
//! inspecting dispatch events.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when RUST_LOG is unset
const DEFAULT_LOG_FILTER: &str = "armada_core=warn,armada_client=warn,armada_cli=info";

#[derive(Parser)]
#[command(name = "armada")]
#[command(about = "Armada Tekton job dispatch CLI", long_about = None)]
struct Cli {
    /// Minion controller URL
    #[arg(long, env = "ARMADA_MINION_URL", default_value = "http://localhost:8081/")]
    minion_url: String,

    #[command(subcommand)]
    command: Commands,
}

/// Log subscriber writing plain lines to `writer`
fn log_subscriber<W>(writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .without_time()
                .with_target(false),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // stderr keeps printed events pipeable
    log_subscriber(std::io::stderr).init();

    let cli = Cli::parse();

    let config = Config {
        minion_url: cli.minion_url,
    };

    handle_command(cli.command, &config).await
}
