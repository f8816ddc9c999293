//! Run command implementation.

use super::output::{JsonMatchResult, format_text};
use super::{CliError, OutputFormat, load_json, load_rules, load_upgrades, seed_or_now};
use flagfall::agent::bots;
use flagfall::controller::{MapGenConfig, Match, generate_setup};
use flagfall::replay::ReplayWriter;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Options of the run command.
#[derive(Debug)]
pub(crate) struct RunOptions {
    pub(crate) seed: Option<u64>,
    pub(crate) rules: Option<PathBuf>,
    pub(crate) upgrades: Option<PathBuf>,
    pub(crate) map: Option<PathBuf>,
    pub(crate) max_rounds: Option<u32>,
    pub(crate) budget: u64,
    pub(crate) format: OutputFormat,
    pub(crate) save: Option<PathBuf>,
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if a config file is invalid or the match aborts.
pub(crate) fn execute(options: &RunOptions) -> Result<(), CliError> {
    let seed = seed_or_now(options.seed);
    let rules = load_rules(options.rules.as_deref(), options.max_rounds)?;
    let upgrades = load_upgrades(options.upgrades.as_deref())?;
    let mapgen: MapGenConfig = load_json(options.map.as_deref())?;

    let setup = generate_setup(seed, &mapgen).map_err(|e| CliError::new(e.to_string()))?;
    let mut game = Match::new(setup, rules, upgrades)
        .map_err(|e| CliError::new(format!("invalid setup: {e}")))?
        .with_fuel(options.budget);
    let mut agents = bots::raiders(game.state(), seed);

    if options.format == OutputFormat::Text {
        println!("Running match with seed {seed}...");
        println!(
            "Map: {} ({}x{}), {} entities",
            game.state().grid.name(),
            game.state().grid.width(),
            game.state().grid.height(),
            agents.len()
        );
        println!();
    }

    let report = if let Some(path) = &options.save {
        let file = File::create(path)
            .map_err(|e| CliError::new(format!("Failed to create {}: {e}", path.display())))?;
        let mut writer = ReplayWriter::new(BufWriter::new(file));
        let report = game.run(&mut agents, &mut writer)?;
        if options.format == OutputFormat::Text {
            println!("Replay saved to: {}", path.display());
            println!();
        }
        report
    } else {
        let mut writer = ReplayWriter::new(std::io::sink());
        game.run(&mut agents, &mut writer)?
    };

    match options.format {
        OutputFormat::Text => print!("{}", format_text(seed, &report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonMatchResult::new(seed, &report))?;
            println!("{json}");
        }
    }

    Ok(())
}
