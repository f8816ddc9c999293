//! Win conditions and the tiebreak.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::game::{MatchState, RuleConfig, Team, TiebreakMetric};

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinReason {
    /// The winner captured enough enemy flags.
    FlagsCaptured,
    /// The loser has no live entities left.
    Elimination,
    /// The round limit was reached and the tiebreak decided.
    RoundLimitTiebreak,
}

impl WinReason {
    /// Wire code used in the replay trailer.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            WinReason::FlagsCaptured => 0,
            WinReason::Elimination => 1,
            WinReason::RoundLimitTiebreak => 2,
        }
    }

    /// Parse a wire code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(WinReason::FlagsCaptured),
            1 => Some(WinReason::Elimination),
            2 => Some(WinReason::RoundLimitTiebreak),
            _ => None,
        }
    }
}

impl std::fmt::Display for WinReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WinReason::FlagsCaptured => write!(f, "flags captured"),
            WinReason::Elimination => write!(f, "elimination"),
            WinReason::RoundLimitTiebreak => write!(f, "round limit tiebreak"),
        }
    }
}

/// Final result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Winning team.
    pub winner: Team,
    /// How the match was decided.
    pub reason: WinReason,
    /// Rounds played.
    pub rounds: u32,
    /// Captures per team, indexed by [`Team::index`].
    pub captures: [u32; 2],
}

impl MatchResult {
    fn new(state: &MatchState, winner: Team, reason: WinReason) -> Self {
        Self {
            winner,
            reason,
            rounds: state.round,
            captures: [state.ledgers[0].captures, state.ledgers[1].captures],
        }
    }
}

/// Evaluate the win conditions on a resolved round.
///
/// Flag captures are checked before elimination. When both teams meet the
/// same condition, or the round limit is reached with no winner, the
/// configured tiebreak decides.
#[must_use]
pub fn check_win(state: &MatchState, rules: &RuleConfig) -> Option<MatchResult> {
    let captured = |team: Team| {
        let needed = state.captures_needed(team, rules);
        needed > 0 && state.ledger(team).captures >= needed
    };
    let eliminated_opponent = |team: Team| state.entities.live_count(team.opponent()) == 0;

    let by_captures = decide(state, rules, captured(Team::A), captured(Team::B));
    if let Some(winner) = by_captures {
        return Some(MatchResult::new(state, winner, WinReason::FlagsCaptured));
    }
    let by_elimination = decide(
        state,
        rules,
        eliminated_opponent(Team::A),
        eliminated_opponent(Team::B),
    );
    if let Some(winner) = by_elimination {
        return Some(MatchResult::new(state, winner, WinReason::Elimination));
    }

    if state.round >= rules.max_rounds {
        return Some(MatchResult::new(
            state,
            tiebreak(state, rules),
            WinReason::RoundLimitTiebreak,
        ));
    }
    None
}

fn decide(state: &MatchState, rules: &RuleConfig, a: bool, b: bool) -> Option<Team> {
    match (a, b) {
        (true, false) => Some(Team::A),
        (false, true) => Some(Team::B),
        (true, true) => Some(tiebreak(state, rules)),
        (false, false) => None,
    }
}

/// Pick a winner by comparing the configured metrics in order.
///
/// Falls back to a choice derived from the map seed, so the same match
/// always breaks the same way.
#[must_use]
pub fn tiebreak(state: &MatchState, rules: &RuleConfig) -> Team {
    for metric in &rules.tiebreak {
        let value = |team: Team| -> u64 {
            match metric {
                TiebreakMetric::FlagsCaptured => u64::from(state.ledger(team).captures),
                TiebreakMetric::LiveEntities => u64::from(state.entities.live_count(team)),
                TiebreakMetric::TotalHealth => state.entities.total_health(team),
            }
        };
        match value(Team::A).cmp(&value(Team::B)) {
            Ordering::Greater => return Team::A,
            Ordering::Less => return Team::B,
            Ordering::Equal => {}
        }
    }
    if state.grid.seed() % 2 == 0 {
        Team::A
    } else {
        Team::B
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        Coord, EntityId, EntitySpawn, FlagId, FlagSpawn, GridSpec, MatchSetup, UpgradeTable,
    };

    fn state(seed: u64) -> MatchState {
        let mut grid = GridSpec::open("victory", 4, 4);
        grid.seed = seed;
        let setup = MatchSetup {
            grid,
            entities: vec![
                EntitySpawn {
                    team: Team::A,
                    position: Coord::new(0, 0),
                },
                EntitySpawn {
                    team: Team::B,
                    position: Coord::new(3, 3),
                },
            ],
            flags: (1..=3)
                .map(|i| FlagSpawn {
                    id: FlagId(i),
                    team: if i == 3 { Team::A } else { Team::B },
                    home: Coord::new(1, u16::try_from(i).unwrap()),
                })
                .collect(),
        };
        MatchState::new(setup, &RuleConfig::default(), UpgradeTable::default()).unwrap()
    }

    #[test]
    fn test_no_winner_mid_match() {
        let state = state(0);
        assert_eq!(check_win(&state, &RuleConfig::default()), None);
    }

    #[test]
    fn test_all_enemy_flags_captured_wins() {
        let rules = RuleConfig::default();
        let mut state = state(0);
        state.ledger_mut(Team::A).captures = 1;
        assert_eq!(check_win(&state, &rules), None);
        state.ledger_mut(Team::A).captures = 2;
        let result = check_win(&state, &rules).unwrap();
        assert_eq!(result.winner, Team::A);
        assert_eq!(result.reason, WinReason::FlagsCaptured);
        assert_eq!(result.captures, [2, 0]);
    }

    #[test]
    fn test_elimination() {
        let rules = RuleConfig::default();
        let mut state = state(0);
        state.entities.get_mut(EntityId(1)).unwrap().take_damage(u32::MAX);
        let result = check_win(&state, &rules).unwrap();
        assert_eq!(result.winner, Team::B);
        assert_eq!(result.reason, WinReason::Elimination);
    }

    #[test]
    fn test_round_limit_uses_captures_first() {
        let rules = RuleConfig {
            max_rounds: 10,
            flags_to_win: Some(5),
            ..RuleConfig::default()
        };
        let mut state = state(1);
        state.round = 10;
        state.ledger_mut(Team::A).captures = 2;
        state.ledger_mut(Team::B).captures = 1;
        let result = check_win(&state, &rules).unwrap();
        assert_eq!(result.winner, Team::A);
        assert_eq!(result.reason, WinReason::RoundLimitTiebreak);
        assert_eq!(result.rounds, 10);
    }

    #[test]
    fn test_tiebreak_walks_metrics_then_seed() {
        let rules = RuleConfig::default();
        let mut even = state(0);
        even.entities.get_mut(EntityId(1)).unwrap().health = 10;
        assert_eq!(tiebreak(&even, &rules), Team::B);

        even.entities.get_mut(EntityId(1)).unwrap().health = rules.max_health;
        assert_eq!(tiebreak(&even, &rules), Team::A);
        assert_eq!(tiebreak(&state(7), &rules), Team::B);
    }
}
