//! Inspect command implementation.

use super::output::{JsonReplaySummary, format_replay_text, format_round};
use super::{CliError, OutputFormat};
use flagfall::replay::ReplayReader;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
struct JsonRoundState<'a> {
    round: u32,
    entities: &'a [flagfall::game::EntityRecord],
    flags: &'a [flagfall::game::FlagRecord],
}

/// Execute the inspect command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid replay.
pub(crate) fn execute(
    path: &Path,
    round: Option<u32>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let bytes = fs::read(path)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
    let replay = ReplayReader::decode(&bytes)?;
    let summary = JsonReplaySummary::from_replay(&replay);

    match (format, round) {
        (OutputFormat::Text, None) => print!("{}", format_replay_text(&summary)),
        (OutputFormat::Text, Some(round)) => {
            let (entities, flags) = replay.state_at(round);
            print!("{}", format_replay_text(&summary));
            println!();
            print!("{}", format_round(round, &entities, &flags));
        }
        (OutputFormat::Json, None) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        (OutputFormat::Json, Some(round)) => {
            let (entities, flags) = replay.state_at(round);
            let state = JsonRoundState {
                round,
                entities: &entities,
                flags: &flags,
            };
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}
