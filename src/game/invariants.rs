//! State invariants - sanity checks that detect engine bugs.
//!
//! Illegal actions are filtered by the validator, so these should NEVER
//! trigger. If they do, the resolver has a bug and the match is aborted.

use std::collections::BTreeMap;

use crate::error::InvariantViolation;
use crate::game::{Flag, FlagState, MatchState, RuleConfig};

/// Check all state invariants.
///
/// Returns every violation found, or an empty list if the state is sound.
#[must_use]
pub fn check_invariants(state: &MatchState, rules: &RuleConfig) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut occupied = BTreeMap::new();

    for entity in state.entities.alive() {
        // Placement
        if state.grid.is_blocked(entity.position) {
            violations.push(InvariantViolation::new(format!(
                "entity {} stands on blocked cell {}",
                entity.id, entity.position
            )));
        }
        if let Some(other) = occupied.insert(entity.position, entity.id) {
            violations.push(InvariantViolation::new(format!(
                "entities {other} and {} share cell {}",
                entity.id, entity.position
            )));
        }

        if entity.health == 0 || entity.health > rules.max_health {
            violations.push(InvariantViolation::new(format!(
                "live entity {} has health {} outside 1..={}",
                entity.id, entity.health, rules.max_health
            )));
        }

        // Back-reference must match the flag's forward link
        if let Some(flag_id) = entity.carried_flag {
            let consistent = state
                .flags
                .get(flag_id)
                .is_some_and(|f| f.state == FlagState::Carried && f.carrier == Some(entity.id));
            if !consistent {
                violations.push(InvariantViolation::new(format!(
                    "entity {} claims {flag_id} but the flag does not name it as carrier",
                    entity.id
                )));
            }
        }
    }

    for entity in state.entities.iter().filter(|e| !e.alive) {
        if entity.carried_flag.is_some() {
            violations.push(InvariantViolation::new(format!(
                "dead entity {} still carries a flag",
                entity.id
            )));
        }
    }

    for flag in state.flags.iter() {
        check_flag(state, flag, &mut violations);
    }

    violations
}

/// Lifecycle and carrier link of one flag.
fn check_flag(state: &MatchState, flag: &Flag, violations: &mut Vec<InvariantViolation>) {
    if !state.grid.in_bounds(flag.position) {
        violations.push(InvariantViolation::new(format!(
            "{} lies outside the grid at {}",
            flag.id, flag.position
        )));
    }

    match (flag.state, flag.carrier) {
        (FlagState::Carried, Some(carrier)) => {
            let Some(entity) = state.entities.live(carrier) else {
                violations.push(InvariantViolation::new(format!(
                    "{} is carried by missing or dead entity {carrier}",
                    flag.id
                )));
                return;
            };
            if entity.carried_flag != Some(flag.id) {
                violations.push(InvariantViolation::new(format!(
                    "{} names carrier {carrier} which does not hold it",
                    flag.id
                )));
            }
            if entity.position != flag.position {
                violations.push(InvariantViolation::new(format!(
                    "{} at {} but its carrier {carrier} is at {}",
                    flag.id, flag.position, entity.position
                )));
            }
            if entity.team == flag.team {
                violations.push(InvariantViolation::new(format!(
                    "{} carried by its own team",
                    flag.id
                )));
            }
        }
        (FlagState::Carried, None) => violations.push(InvariantViolation::new(format!(
            "{} is carried but has no carrier",
            flag.id
        ))),
        (_, Some(carrier)) => violations.push(InvariantViolation::new(format!(
            "{} is not carried but names carrier {carrier}",
            flag.id
        ))),
        (FlagState::AtHome, None) => {
            if flag.position != flag.home {
                violations.push(InvariantViolation::new(format!(
                    "{} is at home but sits on {} instead of {}",
                    flag.id, flag.position, flag.home
                )));
            }
        }
        (FlagState::Dropped, None) => {
            if flag.drop_rounds == 0 {
                violations.push(InvariantViolation::new(format!(
                    "{} is dropped with an expired timer",
                    flag.id
                )));
            }
        }
        (FlagState::Captured, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        Coord, EntityId, EntitySpawn, FlagId, FlagSpawn, GridSpec, MatchSetup, Team, UpgradeTable,
    };

    fn state() -> (MatchState, RuleConfig) {
        let setup = MatchSetup {
            grid: GridSpec::open("inv", 3, 3),
            entities: vec![
                EntitySpawn {
                    team: Team::A,
                    position: Coord::new(0, 0),
                },
                EntitySpawn {
                    team: Team::B,
                    position: Coord::new(2, 2),
                },
            ],
            flags: vec![FlagSpawn {
                id: FlagId(1),
                team: Team::B,
                home: Coord::new(1, 1),
            }],
        };
        let rules = RuleConfig::default();
        let state = MatchState::new(setup, &rules, UpgradeTable::default()).unwrap();
        (state, rules)
    }

    #[test]
    fn test_fresh_state_is_clean() {
        let (state, rules) = state();
        assert!(check_invariants(&state, &rules).is_empty());
    }

    #[test]
    fn test_detects_shared_cell() {
        let (mut state, rules) = state();
        state.entities.get_mut(EntityId(2)).unwrap().position = Coord::new(0, 0);
        let violations = check_invariants(&state, &rules);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("share cell"));
    }

    #[test]
    fn test_detects_one_sided_carry() {
        let (mut state, rules) = state();
        state.entities.get_mut(EntityId(1)).unwrap().carried_flag = Some(FlagId(1));
        assert!(!check_invariants(&state, &rules).is_empty());

        let (mut state, rules) = self::state();
        state
            .flags
            .get_mut(FlagId(1))
            .unwrap()
            .pick_up(EntityId(1), Coord::new(0, 0));
        assert!(!check_invariants(&state, &rules).is_empty());
    }

    #[test]
    fn test_carried_flag_must_follow_carrier() {
        let (mut state, rules) = state();
        state.entities.get_mut(EntityId(1)).unwrap().carried_flag = Some(FlagId(1));
        state
            .flags
            .get_mut(FlagId(1))
            .unwrap()
            .pick_up(EntityId(1), Coord::new(0, 0));
        assert!(check_invariants(&state, &rules).is_empty());

        state.entities.get_mut(EntityId(1)).unwrap().position = Coord::new(0, 1);
        let violations = check_invariants(&state, &rules);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("carrier"));
    }
}
