//! Finexport CLI - export linked bank data to object storage

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{check_config, institutions, run};

/// Finexport - export Plaid accounts and transactions as CSV
#[derive(Parser)]
#[command(name = "finexport", version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one export
    Run(run::RunArgs),

    /// List the supported institutions
    Institutions {
        /// Load the registry from a JSON file instead of the built-in one
        #[arg(long)]
        institutions: Option<std::path::PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration and print it with secrets masked
    CheckConfig,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays clean
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("finexport={0},finexport_core={0}", level).into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::run(args),
        Commands::Institutions { institutions, json } => {
            institutions::run(institutions.as_deref(), json)
        }
        Commands::CheckConfig => check_config::run(),
    }
}
