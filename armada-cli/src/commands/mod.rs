//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod decode;
mod dispatch;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Sanitize every PipelineRun in a manifest file and send it to the minion
    Dispatch {
        /// Path to a YAML manifest file, possibly holding several documents
        #[arg(short, long)]
        file: String,

        /// Namespace to create the jobs in; defaults to each job's own
        #[arg(short, long)]
        namespace: Option<String>,

        /// Override the minion URL for this call
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the dispatch events for a manifest file without sending them
    Encode {
        /// Path to a YAML manifest file
        #[arg(short, long)]
        file: String,

        /// Namespace to create the jobs in; defaults to each job's own
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Print the job carried by a dispatch event
    Decode {
        /// Path to a dispatch event JSON file
        #[arg(short, long)]
        file: String,
    },
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Dispatch {
            file,
            namespace,
            url,
        } => {
            let url = url.unwrap_or_else(|| config.minion_url.clone());
            dispatch::dispatch(&file, namespace.as_deref(), &url).await
        }
        Commands::Encode { file, namespace } => dispatch::encode(&file, namespace.as_deref()),
        Commands::Decode { file } => decode::decode(&file),
    }
}
