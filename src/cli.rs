//! CLI command implementations for Flagfall.

pub(crate) mod inspect;
pub(crate) mod run;
pub(crate) mod verify;

mod output;

use clap::ValueEnum;
use flagfall::error::{DecodeError, MatchError};
use flagfall::{RuleConfig, UpgradeTable};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Output format for `run` and `inspect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug, Error)]
#[error("{message}")]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<MatchError> for CliError {
    fn from(e: MatchError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<DecodeError> for CliError {
    fn from(e: DecodeError) -> Self {
        Self::new(format!("invalid replay: {e}"))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}

/// Load a JSON config file, or the type's default when no path is given.
fn load_json<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, CliError> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::new(format!("Failed to parse {}: {e}", path.display())))
}

/// Rules from `path` with an optional round limit override.
pub(crate) fn load_rules(
    path: Option<&Path>,
    max_rounds: Option<u32>,
) -> Result<RuleConfig, CliError> {
    let mut rules: RuleConfig = load_json(path)?;
    if let Some(max_rounds) = max_rounds {
        rules.max_rounds = max_rounds;
    }
    rules
        .validate()
        .map_err(|e| CliError::new(format!("invalid rules: {e}")))?;
    Ok(rules)
}

/// Upgrade table from `path`.
pub(crate) fn load_upgrades(path: Option<&Path>) -> Result<UpgradeTable, CliError> {
    load_json(path)
}

/// Seed from the clock when none was given.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn seed_or_now(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    })
}
