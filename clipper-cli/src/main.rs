//! Main entry point for the Clipper CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use dotenv::dotenv;
use shared::config::ClientConfig;
use url::Url;

mod commands;

use commands::session::SessionCommand;

/// Clipper CLI
#[derive(Parser)]
#[command(name = "clipper")]
#[command(about = "Command-line client for the Clipper session API", long_about = None)]
struct Cli {
    /// Path to the configuration file (optional)
    #[arg(
        long,
        short,
        global = true,
        help = "Path to the configuration file (e.g., clipper.yaml or clipper.json). If not provided, defaults and CLIPPER_* variables are used."
    )]
    config: Option<PathBuf>,

    /// Base URL of the Clipper API
    #[arg(
        long,
        global = true,
        help = "Base URL of the Clipper API (e.g., http://localhost:8080/api/v1/). Overrides the configuration file."
    )]
    server: Option<Url>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the Clipper CLI
#[derive(Subcommand)]
enum Commands {
    /// Inspect and manage the authenticated session
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)
        #[arg(long, short, value_enum)]
        shell: Shell,
    },

    /// Generate a configuration file
    Config {
        /// Format of the configuration file to generate (yaml or json). Defaults to yaml.
        #[arg(
            long,
            short,
            help = "Format of the configuration file to generate (yaml or json). Defaults to yaml."
        )]
        format: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Session { action } => {
            let config = ClientConfig::load_config(cli.config, cli.server)?;
            client::telemetry::init_tracing(&config.log_level);
            commands::session::run(&config, action).await?;
        }
        Commands::Completion { shell } => {
            commands::completion::generate_completion(shell);
        }
        Commands::Config { format } => {
            let format = format.unwrap_or_else(|| "yaml".to_string());
            commands::config::generate_config(&format)?;
        }
    }

    Ok(())
}
