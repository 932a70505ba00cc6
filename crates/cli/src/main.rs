//! `aipctl`: admin tooling for validating server/bidder config and
//! generating bidder Ed25519 keypairs.

mod config;
mod hash;
mod keygen;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aipctl", about = "Admin CLI for the AIP auction server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging.
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and inspect configuration files.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate an Ed25519 keypair for a new bidder.
    Keygen {
        /// Bidder name, used only in the printed output.
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a server config and its paired bidder/platform configs.
    Validate {
        #[arg(long)]
        server: String,
        #[arg(long)]
        bidders: Option<String>,
        #[arg(long)]
        platforms: Option<String>,
    },
    /// Print the SHA-256 content hash of a config file.
    Hash {
        #[arg(long)]
        file: String,
    },
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        eprintln!("aipctl: verbose logging enabled");
    }

    let result = match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Validate { server, bidders, platforms } => {
                config::validate(&server, bidders.as_deref(), platforms.as_deref())
            }
            ConfigAction::Hash { file } => hash::compute_and_display(&file),
        },
        Commands::Keygen { name } => keygen::generate(&name),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
