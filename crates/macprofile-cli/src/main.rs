//! macprofile CLI - Plan and apply configuration profiles from a manifest.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::{apply, digest, normalize, plan};

#[derive(Parser)]
#[command(name = "macprofile")]
#[command(about = "Deterministic identities and reconciliation for configuration profiles")]
#[command(version)]
struct Cli {
    /// Manifest file path
    #[arg(short, long, global = true, env = "MACPROFILE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, env = "MACPROFILE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "MACPROFILE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content-derived identity of a profile document
    Digest {
        /// Path to the profile document
        file: PathBuf,
    },
    /// Print a profile document with identities filled in
    Normalize {
        /// Path to the profile document
        file: PathBuf,
        /// Identity to use for the document itself
        #[arg(long)]
        uuid: Option<String>,
    },
    /// Show the actions needed to reach the manifest's state
    Plan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply the manifest to this machine
    Apply {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let result = match cli.command {
        Commands::Digest { file } => digest::run(file),
        Commands::Normalize { file, uuid } => normalize::run(file, uuid),
        Commands::Plan { json } => plan::run(cli.config, json),
        Commands::Apply { json } => apply::run(cli.config, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
