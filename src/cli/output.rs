//! Output formatting utilities for CLI.

use flagfall::MatchReport;
use flagfall::game::{EntityRecord, FlagRecord, FlagState, Team};
use flagfall::replay::Replay;
use serde::Serialize;
use std::fmt::Write;

/// JSON-serializable match result.
#[derive(Debug, Serialize)]
pub(super) struct JsonMatchResult<'a> {
    /// Random seed used.
    pub(super) seed: u64,
    /// Match summary.
    #[serde(flatten)]
    pub(super) report: &'a MatchReport,
}

impl<'a> JsonMatchResult<'a> {
    /// Wrap a report.
    pub(super) const fn new(seed: u64, report: &'a MatchReport) -> Self {
        Self { seed, report }
    }
}

/// Format a match report as human-readable text.
pub(super) fn format_text(seed: u64, report: &MatchReport) -> String {
    let mut output = String::new();
    let result = &report.result;

    let _ = writeln!(output, "Match Result (seed: {seed})");
    let _ = writeln!(output, "  Winner: Team {:?} ({})", result.winner, result.reason);
    let _ = writeln!(output, "  Rounds: {}", report.rounds);
    for team in Team::ALL {
        let _ = writeln!(
            output,
            "  Team {team:?}: {} captures",
            result.captures[team.index()]
        );
    }
    let _ = writeln!(output, "  Rejected actions: {}", report.rejections);
    if report.exhausted > 0 {
        let _ = writeln!(output, "  Turns lost to budget: {}", report.exhausted);
    }
    let _ = writeln!(output, "  Replay size: {} bytes", report.replay_bytes);

    output
}

/// JSON-serializable replay summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonReplaySummary {
    /// Map name.
    pub(super) map: String,
    /// Map size.
    pub(super) width: u16,
    /// Map size.
    pub(super) height: u16,
    /// Map seed.
    pub(super) seed: u64,
    /// Round blocks in the log.
    pub(super) rounds: usize,
    /// Events across all rounds.
    pub(super) events: usize,
    /// Winner, if the log has a trailer.
    pub(super) result: Option<flagfall::MatchResult>,
}

impl JsonReplaySummary {
    /// Summarise a decoded replay.
    pub(super) fn from_replay(replay: &Replay) -> Self {
        Self {
            map: replay.header.map_name.clone(),
            width: replay.header.width,
            height: replay.header.height,
            seed: replay.header.seed,
            rounds: replay.round_count(),
            events: replay.rounds.iter().map(|r| r.events.len()).sum(),
            result: replay.result,
        }
    }
}

/// Format a replay summary as text.
pub(super) fn format_replay_text(summary: &JsonReplaySummary) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Replay: {} ({}x{}, seed {})",
        summary.map, summary.width, summary.height, summary.seed
    );
    let _ = writeln!(output, "  Rounds: {}", summary.rounds);
    let _ = writeln!(output, "  Events: {}", summary.events);
    if let Some(result) = summary.result {
        let [a, b] = result.captures;
        let _ = writeln!(
            output,
            "  Winner: Team {:?} ({}, round {}, captures {a}-{b})",
            result.winner, result.reason, result.rounds
        );
    } else {
        let _ = writeln!(output, "  Unfinished (no result trailer)");
    }
    output
}

/// Format the entity and flag records of one round.
pub(super) fn format_round(round: u32, entities: &[EntityRecord], flags: &[FlagRecord]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Round {round}");
    for e in entities {
        let _ = write!(
            output,
            "  entity {:>4} {:?} at {} hp {:>4} cd {}/{}",
            e.id.0, e.team, e.position, e.health, e.action_cooldown, e.movement_cooldown
        );
        if let Some(flag) = e.carried_flag {
            let _ = write!(output, " carrying flag {}", flag.0);
        }
        output.push('\n');
    }
    for f in flags {
        let _ = write!(
            output,
            "  flag {:>4} {:?} at {} {:?}",
            f.id.0, f.team, f.position, f.state
        );
        if f.state == FlagState::Dropped {
            let _ = write!(output, " returns in {}", f.drop_rounds);
        }
        output.push('\n');
    }
    output
}
