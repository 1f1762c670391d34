//! viva CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "viva", version, about = "LLM-driven oral exam runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive exam session
    Run {
        /// Student identifier recorded on the session
        #[arg(long, default_value = "student")]
        student: String,

        /// Force the offline backend (canned questions, heuristic grading)
        #[arg(long)]
        offline: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the transcript of a stored session
    Show {
        /// Session id
        session: Uuid,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check that the prompt templates render
    Validate {
        /// Directory of template overrides to check
        #[arg(long)]
        prompt_dir: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and prompt directory
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("viva=info".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            student,
            offline,
            config,
        } => commands::run::execute(student, offline, config).await,
        Commands::Show { session, config } => commands::show::execute(session, config).await,
        Commands::Validate { prompt_dir, config } => commands::validate::execute(prompt_dir, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
