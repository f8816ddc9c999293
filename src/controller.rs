//! Match controller.
//!
//! Drives a match from setup to result:
//! - Agents decide concurrently with rayon, each on its own fuel budget
//! - The collected requests go through the single-threaded resolver
//! - Every committed round is appended to the replay log
//!
//! Given the same setup, rules and agents, a run always produces the same
//! replay bytes.

pub mod mapgen;

pub use mapgen::{MapGenConfig, MapGenError, Rng, generate_setup};

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::{AgentView, Budget, DEFAULT_FUEL_BUDGET, Roster, bots};
use crate::error::{ConfigError, MatchError};
use crate::game::{
    Action, ActionRequest, MatchResult, MatchSetup, MatchState, RoundOutcome, RuleConfig,
    UpgradeTable, resolve_round,
};
use crate::replay::{ReplayHeader, ReplayWriter};

/// Cooperative cancellation flag, checked after each committed round.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the match to stop after the current round.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Has a stop been requested?
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Summary of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Winner and reason.
    pub result: MatchResult,
    /// Rounds played.
    pub rounds: u32,
    /// Requests turned into no-ops over the whole match.
    pub rejections: u64,
    /// Agent turns lost to an exhausted budget.
    pub exhausted: u64,
    /// Size of the replay log.
    pub replay_bytes: u64,
}

/// A match ready to run.
#[derive(Debug)]
pub struct Match {
    state: MatchState,
    rules: RuleConfig,
    fuel: u64,
    stop: StopHandle,
}

impl Match {
    /// Validate the setup and build round 0.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the rules, grid or placement are invalid.
    pub fn new(
        setup: MatchSetup,
        rules: RuleConfig,
        upgrades: UpgradeTable,
    ) -> Result<Self, ConfigError> {
        let state = MatchState::new(setup, &rules, upgrades)?;
        Ok(Self {
            state,
            rules,
            fuel: DEFAULT_FUEL_BUDGET,
            stop: StopHandle::default(),
        })
    }

    /// Set the per-agent, per-round fuel budget.
    #[must_use]
    pub const fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    /// Handle that cancels this match from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Committed state.
    #[must_use]
    pub const fn state(&self) -> &MatchState {
        &self.state
    }

    /// Rules in force.
    #[must_use]
    pub const fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    /// Play until the match is decided.
    ///
    /// Entities without an agent do nothing. Agents of dead entities are
    /// not consulted.
    ///
    /// # Errors
    ///
    /// Returns an error if an invariant breaks, the replay cannot be
    /// written, or a stop was requested.
    pub fn run<W: Write>(
        &mut self,
        agents: &mut Roster,
        writer: &mut ReplayWriter<W>,
    ) -> Result<MatchReport, MatchError> {
        info!(
            map = %self.state.grid.name(),
            entities = self.state.entities.len(),
            flags = self.state.flags.len(),
            max_rounds = self.rules.max_rounds,
            "match started"
        );
        writer.write_header(&ReplayHeader::new(&self.state, &self.rules))?;

        let mut rejections = 0u64;
        let mut exhausted = 0u64;
        loop {
            let (requests, lost) = self.collect(agents);
            exhausted += lost;

            let report = resolve_round(&mut self.state, &self.rules, &requests)?;
            rejections += u64::try_from(report.rejections.len()).unwrap_or(u64::MAX);
            writer.write_round(&report.snapshot)?;

            if let RoundOutcome::MatchOver(result) = report.outcome {
                writer.finish(&result)?;
                info!(
                    winner = ?result.winner,
                    reason = %result.reason,
                    rounds = result.rounds,
                    captures_a = result.captures[0],
                    captures_b = result.captures[1],
                    "match finished"
                );
                return Ok(MatchReport {
                    result,
                    rounds: result.rounds,
                    rejections,
                    exhausted,
                    replay_bytes: writer.bytes_written(),
                });
            }

            if self.stop.is_stopped() {
                warn!(round = self.state.round, "match cancelled");
                return Err(MatchError::Cancelled {
                    round: self.state.round,
                });
            }
        }
    }

    /// Ask every agent of a live entity for its action.
    ///
    /// Returns the requests and the number of agents that ran out of fuel.
    fn collect(&self, agents: &mut Roster) -> (Vec<ActionRequest>, u64) {
        let state = &self.state;
        let rules = &self.rules;
        let fuel = self.fuel;

        let decisions: Vec<(ActionRequest, bool)> = agents
            .par_iter_mut()
            .filter_map(|(&id, agent)| {
                let view = AgentView::new(state, rules, id)?;
                let mut budget = Budget::new(fuel);
                match agent.act(&view, &mut budget) {
                    Ok(action) => Some((ActionRequest::new(id, action), false)),
                    Err(err) => {
                        warn!(entity = %id, agent = agent.name(), round = view.round(), "{err}");
                        Some((ActionRequest::new(id, Action::Noop), true))
                    }
                }
            })
            .collect();

        let lost = decisions.iter().filter(|(_, lost)| *lost).count();
        let lost = u64::try_from(lost).unwrap_or(u64::MAX);
        (decisions.into_iter().map(|(r, _)| r).collect(), lost)
    }
}

/// Generate the map for `seed`, play it with raiders on both sides and
/// return the report with the replay bytes.
///
/// # Errors
///
/// Returns an error if generation fails or the match aborts.
pub fn run_seeded(
    seed: u64,
    mapgen: &MapGenConfig,
    rules: &RuleConfig,
    upgrades: UpgradeTable,
) -> Result<(MatchReport, Vec<u8>), MatchError> {
    let setup = generate_setup(seed, mapgen)?;
    let mut game = Match::new(setup, rules.clone(), upgrades)?;
    let mut agents = bots::raiders(game.state(), seed);
    let mut writer = ReplayWriter::new(Vec::new());
    let report = game.run(&mut agents, &mut writer)?;
    Ok((report, writer.into_inner()))
}
