//! Complete match state and its construction from a setup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::game::{
    Coord, EntityStore, FlagId, FlagTable, Grid, GridSpec, RuleConfig, Team, UpgradeRegistry,
    UpgradeTable,
};

/// A starting entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpawn {
    /// Team the entity plays for.
    pub team: Team,
    /// Starting cell.
    pub position: Coord,
}

/// A flag at its home cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSpawn {
    /// Flag id.
    pub id: FlagId,
    /// Owning team.
    pub team: Team,
    /// Home cell.
    pub home: Coord,
}

/// Validated-by-construction input of a match: grid plus initial placements.
///
/// Entity ids are assigned in list order starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSetup {
    /// The map.
    pub grid: GridSpec,
    /// Starting entities.
    pub entities: Vec<EntitySpawn>,
    /// Flags.
    pub flags: Vec<FlagSpawn>,
}

/// Per-team counters that live outside entity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamLedger {
    /// Enemy flags captured so far.
    pub captures: u32,
    /// Unspent upgrade points.
    pub upgrade_points: u32,
}

/// Complete state of a running match.
///
/// Mutated only by the round resolver. Agents get shared references.
#[derive(Debug, Clone)]
pub struct MatchState {
    /// The map, shared read-only.
    pub grid: Arc<Grid>,
    /// All entities.
    pub entities: EntityStore,
    /// All flags.
    pub flags: FlagTable,
    /// Active upgrades per team.
    pub upgrades: UpgradeRegistry,
    /// Per-team counters, indexed by [`Team::index`].
    pub ledgers: [TeamLedger; 2],
    /// Last committed round (0 before the first round).
    pub round: u32,
}

impl MatchState {
    /// Build the initial state.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the grid is malformed, an entity or flag
    /// sits outside the grid or on a wall, two entities share a cell, or a
    /// flag id repeats.
    pub fn new(
        setup: MatchSetup,
        rules: &RuleConfig,
        upgrades: UpgradeTable,
    ) -> Result<Self, ConfigError> {
        rules.validate()?;
        let grid = Grid::new(setup.grid)?;

        let mut entities = EntityStore::new();
        for spawn in &setup.entities {
            if grid.is_blocked(spawn.position) {
                return Err(ConfigError::Placement {
                    what: format!("team {} entity", spawn.team),
                    coord: spawn.position,
                });
            }
            if let Some(other) = entities.occupant(spawn.position) {
                let first = other.id;
                let second = entities.spawn(spawn.team, spawn.position, rules.max_health);
                return Err(ConfigError::SharedCell {
                    first,
                    second,
                    coord: spawn.position,
                });
            }
            entities.spawn(spawn.team, spawn.position, rules.max_health);
        }

        let mut flags = FlagTable::new();
        for spawn in &setup.flags {
            if grid.is_blocked(spawn.home) {
                return Err(ConfigError::Placement {
                    what: spawn.id.to_string(),
                    coord: spawn.home,
                });
            }
            flags.insert(spawn.id, spawn.team, spawn.home)?;
        }

        Ok(Self {
            grid: Arc::new(grid),
            entities,
            flags,
            upgrades: UpgradeRegistry::new(upgrades),
            ledgers: [TeamLedger::default(); 2],
            round: 0,
        })
    }

    /// A team's ledger.
    #[must_use]
    pub const fn ledger(&self, team: Team) -> &TeamLedger {
        &self.ledgers[team.index()]
    }

    /// A team's ledger, mutably.
    #[must_use]
    pub fn ledger_mut(&mut self, team: Team) -> &mut TeamLedger {
        &mut self.ledgers[team.index()]
    }

    /// Captures a team needs to win under `rules`.
    #[must_use]
    pub fn captures_needed(&self, team: Team, rules: &RuleConfig) -> u32 {
        rules.captures_to_win(self.flags.owned_by(team.opponent()))
    }

    /// Cooldown recovered this round by an entity of `team` standing on `cell`.
    ///
    /// Returns 0 for cells outside the grid; the invariant check reports those.
    #[must_use]
    pub fn recovery(&self, team: Team, cell: Coord, rules: &RuleConfig) -> u32 {
        let reduction = crate::game::apply_delta(
            rules.base_cooldown_reduction,
            self.upgrades.effective_cooldown_reduction(team),
        );
        self.grid.recovery_at(cell, reduction).unwrap_or(0)
    }

    /// Heal amount for an entity of `team`.
    #[must_use]
    pub fn heal_amount(&self, team: Team, rules: &RuleConfig) -> u32 {
        crate::game::apply_delta(rules.base_heal, self.upgrades.effective_heal_change(team))
    }

    /// Return delay for a flag dropped by an entity of `carrier_team`.
    ///
    /// The dropping team's Capturing upgrade lengthens the delay. Never below 1.
    #[must_use]
    pub fn flag_return_delay(&self, carrier_team: Team, rules: &RuleConfig) -> u32 {
        crate::game::apply_delta(
            rules.flag_return_delay,
            self.upgrades.effective_flag_return_delay_change(carrier_team),
        )
        .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{EntityId, GlobalUpgrade, Terrain};

    fn setup() -> MatchSetup {
        let mut grid = GridSpec::open("state", 4, 4);
        grid.set_terrain(Coord::new(2, 2), Terrain::Wall);
        MatchSetup {
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
            flags: vec![FlagSpawn {
                id: FlagId(1),
                team: Team::B,
                home: Coord::new(3, 0),
            }],
        }
    }

    #[test]
    fn test_initial_state() {
        let rules = RuleConfig::default();
        let state = MatchState::new(setup(), &rules, UpgradeTable::default()).unwrap();
        assert_eq!(state.round, 0);
        assert_eq!(state.entities.live_ids(), vec![EntityId(1), EntityId(2)]);
        assert_eq!(state.entities.get(EntityId(1)).unwrap().health, rules.max_health);
        assert_eq!(state.flags.len(), 1);
        assert_eq!(state.captures_needed(Team::A, &rules), 1);
        assert_eq!(state.captures_needed(Team::B, &rules), 0);
    }

    #[test]
    fn test_entity_on_wall_rejected() {
        let mut bad = setup();
        bad.entities[0].position = Coord::new(2, 2);
        let err = MatchState::new(bad, &RuleConfig::default(), UpgradeTable::default());
        assert!(matches!(err, Err(ConfigError::Placement { .. })));
    }

    #[test]
    fn test_shared_start_cell_rejected() {
        let mut bad = setup();
        bad.entities[1].position = Coord::new(0, 0);
        let err = MatchState::new(bad, &RuleConfig::default(), UpgradeTable::default());
        assert!(matches!(
            err,
            Err(ConfigError::SharedCell {
                first: EntityId(1),
                second: EntityId(2),
                ..
            })
        ));
    }

    #[test]
    fn test_effective_values_follow_upgrades() {
        let rules = RuleConfig::default();
        let mut state = MatchState::new(setup(), &rules, UpgradeTable::default()).unwrap();
        assert_eq!(state.flag_return_delay(Team::A, &rules), 4);
        state.upgrades.activate(Team::A, GlobalUpgrade::Capturing);
        state.upgrades.activate(Team::A, GlobalUpgrade::Capturing);
        assert_eq!(state.flag_return_delay(Team::A, &rules), 12);
        assert_eq!(rules.flag_return_delay, 4);

        state.upgrades.activate(Team::B, GlobalUpgrade::Healing);
        assert_eq!(state.heal_amount(Team::B, &rules), 130);
        state.upgrades.activate(Team::B, GlobalUpgrade::Action);
        assert_eq!(state.recovery(Team::B, Coord::new(0, 0), &rules), 14);
        assert_eq!(state.recovery(Team::A, Coord::new(0, 0), &rules), 10);
    }
}
