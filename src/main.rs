//! Flagfall CLI - run, inspect and verify capture-the-flag matches.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Flagfall - a deterministic capture-the-flag engine
#[derive(Parser, Debug)]
#[command(name = "flagfall")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one match between the reference raiders
    Run {
        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Rule constants as JSON (default: built-in rules)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Upgrade table as JSON (default: built-in table)
        #[arg(long)]
        upgrades: Option<PathBuf>,

        /// Map generator settings as JSON
        #[arg(long)]
        map: Option<PathBuf>,

        /// Override the round limit
        #[arg(short = 't', long)]
        max_rounds: Option<u32>,

        /// Fuel per agent per round
        #[arg(short, long, default_value = "10000")]
        budget: u64,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save the replay log to file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Decode a replay log and summarise it
    Inspect {
        /// Replay file
        #[arg(required = true)]
        replay: PathBuf,

        /// Show the entity and flag records at this round
        #[arg(short, long)]
        round: Option<u32>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Play a seed range twice and compare the replays byte for byte
    Verify {
        /// Number of seeds to check
        #[arg(short, long, default_value = "64")]
        games: u64,

        /// First seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Override the round limit
        #[arg(short = 't', long)]
        max_rounds: Option<u32>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Run {
            seed,
            rules,
            upgrades,
            map,
            max_rounds,
            budget,
            format,
            save,
        } => cli::run::execute(&cli::run::RunOptions {
            seed,
            rules,
            upgrades,
            map,
            max_rounds,
            budget,
            format,
            save,
        }),

        Commands::Inspect {
            replay,
            round,
            format,
        } => cli::inspect::execute(&replay, round, format),

        Commands::Verify {
            games,
            seed,
            max_rounds,
            threads,
            progress,
        } => cli::verify::execute(games, seed, max_rounds, threads, progress),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
