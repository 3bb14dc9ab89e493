//! viva CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "viva", version, about = "Timed interview sessions with automated scoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate attempts against an interview definition
    Run {
        /// Path to the interview definition TOML
        #[arg(long)]
        interview: PathBuf,

        /// Path to the candidates TOML (scripted answers)
        #[arg(long)]
        candidates: PathBuf,

        /// Assessment backend: mock, openai
        #[arg(long, default_value = "mock")]
        assessor: String,

        /// Config file path (for the openai backend)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate an interview definition TOML
    Validate {
        /// Path to the interview definition TOML
        #[arg(long)]
        interview: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("viva=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            interview,
            candidates,
            assessor,
            config,
        } => commands::run::execute(interview, candidates, assessor, config).await,
        Commands::Validate { interview } => commands::validate::execute(interview),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
