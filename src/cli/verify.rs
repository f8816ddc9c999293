//! Verify command implementation.

use super::{CliError, load_rules};
use flagfall::UpgradeTable;
use flagfall::controller::{MapGenConfig, run_seeded};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::time::Instant;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} seeds ({per_sec})";

/// Outcome of replaying one seed twice.
#[derive(Debug)]
enum Check {
    Identical { bytes: usize },
    Diverged { first_difference: usize },
    Failed(String),
}

fn check_seed(seed: u64, mapgen: &MapGenConfig, rules: &flagfall::RuleConfig) -> Check {
    let upgrades = UpgradeTable::default();
    let first = run_seeded(seed, mapgen, rules, upgrades);
    let second = run_seeded(seed, mapgen, rules, upgrades);
    match (first, second) {
        (Ok((_, a)), Ok((_, b))) if a == b => Check::Identical { bytes: a.len() },
        (Ok((_, a)), Ok((_, b))) => Check::Diverged {
            first_difference: a
                .iter()
                .zip(&b)
                .position(|(x, y)| x != y)
                .unwrap_or_else(|| a.len().min(b.len())),
        },
        (Err(e), _) | (_, Err(e)) => Check::Failed(e.to_string()),
    }
}

/// Execute the verify command.
///
/// # Errors
///
/// Returns an error if any seed fails or produces two different replays.
pub(crate) fn execute(
    games: u64,
    seed: u64,
    max_rounds: Option<u32>,
    threads: Option<usize>,
    progress: bool,
) -> Result<(), CliError> {
    let rules = load_rules(None, max_rounds)?;
    let mapgen = MapGenConfig::default();

    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let pb = if progress {
        let pb = ProgressBar::new(games);
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .map_err(|e| CliError::new(format!("progress template: {e}")))?
            .progress_chars("=>-");
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let results: Vec<(u64, Check)> = (0..games)
        .into_par_iter()
        .map(|i| {
            let game_seed = seed.wrapping_add(i);
            let check = check_seed(game_seed, &mapgen, &rules);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            (game_seed, check)
        })
        .collect();

    if let Some(pb) = &pb {
        pb.finish_with_message("done");
    }

    let mut failures = 0u64;
    let mut total_bytes = 0usize;
    for (game_seed, check) in &results {
        match check {
            Check::Identical { bytes } => total_bytes += bytes,
            Check::Diverged { first_difference } => {
                failures += 1;
                eprintln!("seed {game_seed}: replays differ at byte {first_difference}");
            }
            Check::Failed(reason) => {
                failures += 1;
                eprintln!("seed {game_seed}: {reason}");
            }
        }
    }

    println!(
        "Verified {games} seeds in {:.2}s ({total_bytes} replay bytes)",
        start.elapsed().as_secs_f64()
    );

    if failures > 0 {
        return Err(CliError::new(format!("{failures} of {games} seeds failed")));
    }
    Ok(())
}
