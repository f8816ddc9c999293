//! Reference agents for demos, tests and benchmarks.

use crate::agent::{Agent, AgentView, Budget, BudgetExhausted, Roster};
use crate::controller::Rng;
use crate::game::{
    Action, Coord, Direction, EntityId, FlagState, GlobalUpgrade, MatchState, Team,
};

/// Never does anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleAgent;

impl Agent for IdleAgent {
    fn name(&self) -> &str {
        "idle"
    }

    fn act(
        &mut self,
        _view: &AgentView<'_>,
        budget: &mut Budget,
    ) -> Result<Action, BudgetExhausted> {
        budget.charge(1)?;
        Ok(Action::Noop)
    }
}

/// Plays a fixed action per round: entry `i` in round `i + 1`, then no-ops.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    script: Vec<Action>,
}

impl ScriptedAgent {
    /// Agent playing `script`.
    #[must_use]
    pub fn new(script: Vec<Action>) -> Self {
        Self { script }
    }
}

impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    fn act(
        &mut self,
        view: &AgentView<'_>,
        budget: &mut Budget,
    ) -> Result<Action, BudgetExhausted> {
        budget.charge(1)?;
        let idx = view.round().saturating_sub(1) as usize;
        Ok(self.script.get(idx).copied().unwrap_or_default())
    }
}

/// Greedy capture-the-flag player.
///
/// Priorities: buy an upgrade, carry a flag home, attack, pick up, heal,
/// then walk towards the nearest enemy flag (or enemy, once none is left).
#[derive(Debug, Clone, Copy)]
pub struct RaiderAgent {
    rng: Rng,
}

impl RaiderAgent {
    /// Raider whose tie-breaking wander is seeded by `seed` and `entity`.
    #[must_use]
    pub fn new(seed: u64, entity: EntityId) -> Self {
        let mixed = seed ^ u64::from(entity.0).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self {
            rng: Rng::new(mixed),
        }
    }

    fn nearest(
        from: Coord,
        cells: impl Iterator<Item = Coord>,
        budget: &mut Budget,
    ) -> Result<Option<Coord>, BudgetExhausted> {
        let mut best: Option<(u32, Coord)> = None;
        for cell in cells {
            budget.charge(1)?;
            let d = from.dist_sq(cell);
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, cell));
            }
        }
        Ok(best.map(|(_, c)| c))
    }

    /// One step towards `goal`; a random legal step if no step gets closer.
    #[allow(clippy::cast_possible_truncation)]
    fn step_towards(
        &mut self,
        view: &AgentView<'_>,
        goal: Coord,
        budget: &mut Budget,
    ) -> Result<Action, BudgetExhausted> {
        let me = view.me();
        let grid = view.grid();
        let here = me.position.dist_sq(goal);
        let mut best: Option<(u32, Coord)> = None;
        let mut legal = Vec::with_capacity(8);

        for dir in Direction::ALL {
            budget.charge(2)?;
            let Some(to) = me.position.step(dir, grid.width(), grid.height()) else {
                continue;
            };
            if !view.can(Action::Move { to }) {
                continue;
            }
            legal.push(to);
            let d = to.dist_sq(goal);
            if d < here && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, to));
            }
        }

        if let Some((_, to)) = best {
            return Ok(Action::Move { to });
        }
        if legal.is_empty() {
            return Ok(Action::Noop);
        }
        let pick = self.rng.next_u32(legal.len() as u32) as usize;
        Ok(legal
            .get(pick)
            .map_or(Action::Noop, |&to| Action::Move { to }))
    }
}

impl Agent for RaiderAgent {
    fn name(&self) -> &str {
        "raider"
    }

    fn act(
        &mut self,
        view: &AgentView<'_>,
        budget: &mut Budget,
    ) -> Result<Action, BudgetExhausted> {
        budget.charge(1)?;
        let me = view.me();
        let rules = view.rules();

        for upgrade in [
            GlobalUpgrade::Action,
            GlobalUpgrade::Capturing,
            GlobalUpgrade::Healing,
        ] {
            let buy = Action::BuyUpgrade { upgrade };
            if view.can(buy) {
                return Ok(buy);
            }
        }

        if me.carried_flag.is_some() {
            let home = Self::nearest(me.position, view.grid().spawn_zone(me.team), budget)?;
            if let Some(home) = home {
                return self.step_towards(view, home, budget);
            }
        }

        // Weakest enemy in range, lowest id on ties
        let mut target: Option<(u32, EntityId)> = None;
        for enemy in view.enemies() {
            budget.charge(1)?;
            if me.position.dist_sq(enemy.position) <= rules.attack_radius_sq
                && target.is_none_or(|(hp, _)| enemy.health < hp)
            {
                target = Some((enemy.health, enemy.id));
            }
        }
        if let Some((_, target)) = target {
            let attack = Action::Attack { target };
            if view.can(attack) {
                return Ok(attack);
            }
        }

        for flag in view.flags() {
            budget.charge(1)?;
            if flag.position == me.position {
                let pickup = Action::PickupFlag { flag: flag.id };
                if view.can(pickup) {
                    return Ok(pickup);
                }
            }
        }

        let mut patient: Option<(u32, EntityId)> = None;
        for ally in view.allies() {
            budget.charge(1)?;
            if ally.health < rules.max_health
                && me.position.dist_sq(ally.position) <= rules.heal_radius_sq
                && patient.is_none_or(|(hp, _)| ally.health < hp)
            {
                patient = Some((ally.health, ally.id));
            }
        }
        if let Some((_, target)) = patient {
            let heal = Action::Heal { target };
            if view.can(heal) {
                return Ok(heal);
            }
        }

        let team = me.team;
        let enemy_flags = view
            .flags()
            .filter(move |f| f.team != team && f.state.is_pickable())
            .map(|f| f.position);
        let mut goal = Self::nearest(me.position, enemy_flags, budget)?;
        if goal.is_none() {
            // Chase whoever carries one of our flags, else any enemy
            let carriers = view
                .flags()
                .filter(move |f| f.team == team && f.state == FlagState::Carried)
                .map(|f| f.position);
            goal = Self::nearest(me.position, carriers, budget)?;
        }
        if goal.is_none() {
            let enemies = view.enemies().map(|e| e.position);
            goal = Self::nearest(me.position, enemies, budget)?;
        }

        match goal {
            Some(goal) if goal != me.position => self.step_towards(view, goal, budget),
            _ => Ok(Action::Noop),
        }
    }
}

/// One agent per live entity, built by `make`.
#[must_use]
pub fn roster_with(
    state: &MatchState,
    mut make: impl FnMut(EntityId, Team) -> Box<dyn Agent>,
) -> Roster {
    state
        .entities
        .alive()
        .map(|e| (e.id, make(e.id, e.team)))
        .collect()
}

/// A raider for every live entity.
#[must_use]
pub fn raiders(state: &MatchState, seed: u64) -> Roster {
    roster_with(state, |id, _| Box::new(RaiderAgent::new(seed, id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        EntitySpawn, FlagId, FlagSpawn, GridSpec, MatchSetup, RuleConfig, Terrain, UpgradeTable,
    };

    fn state() -> (MatchState, RuleConfig) {
        let mut grid = GridSpec::open("bots", 6, 6);
        grid.set_terrain(Coord::new(0, 0), Terrain::SpawnA);
        grid.set_terrain(Coord::new(5, 5), Terrain::SpawnB);
        let setup = MatchSetup {
            grid,
            entities: vec![
                EntitySpawn {
                    team: Team::A,
                    position: Coord::new(0, 0),
                },
                EntitySpawn {
                    team: Team::B,
                    position: Coord::new(5, 5),
                },
            ],
            flags: vec![FlagSpawn {
                id: FlagId(1),
                team: Team::B,
                home: Coord::new(4, 4),
            }],
        };
        let rules = RuleConfig::default();
        let state = MatchState::new(setup, &rules, UpgradeTable::default()).unwrap();
        (state, rules)
    }

    #[test]
    fn test_scripted_agent_follows_rounds() {
        let (state, rules) = state();
        let view = AgentView::new(&state, &rules, EntityId(1)).unwrap();
        let mv = Action::Move { to: Coord::new(1, 1) };
        let mut agent = ScriptedAgent::new(vec![mv]);
        assert_eq!(agent.act(&view, &mut Budget::default()).unwrap(), mv);

        let mut later = state.clone();
        later.round = 5;
        let view = AgentView::new(&later, &rules, EntityId(1)).unwrap();
        assert_eq!(agent.act(&view, &mut Budget::default()).unwrap(), Action::Noop);
    }

    #[test]
    fn test_raider_walks_towards_enemy_flag() {
        let (state, rules) = state();
        let view = AgentView::new(&state, &rules, EntityId(1)).unwrap();
        let mut agent = RaiderAgent::new(7, EntityId(1));
        let action = agent.act(&view, &mut Budget::default()).unwrap();
        assert_eq!(action, Action::Move { to: Coord::new(1, 1) });
    }

    #[test]
    fn test_raider_buys_with_the_point_of_this_round() {
        let (state, _) = state();
        let rules = RuleConfig {
            upgrade_interval: 1,
            ..RuleConfig::default()
        };
        let view = AgentView::new(&state, &rules, EntityId(1)).unwrap();
        let mut agent = RaiderAgent::new(7, EntityId(1));
        let action = agent.act(&view, &mut Budget::default()).unwrap();
        assert_eq!(
            action,
            Action::BuyUpgrade {
                upgrade: GlobalUpgrade::Action
            }
        );
    }

    #[test]
    fn test_raider_respects_budget() {
        let (state, rules) = state();
        let view = AgentView::new(&state, &rules, EntityId(1)).unwrap();
        let mut agent = RaiderAgent::new(7, EntityId(1));
        assert!(agent.act(&view, &mut Budget::new(3)).is_err());
    }

    #[test]
    fn test_raiders_cover_every_entity() {
        let (state, _) = state();
        let roster = raiders(&state, 1);
        assert_eq!(
            roster.keys().copied().collect::<Vec<_>>(),
            vec![EntityId(1), EntityId(2)]
        );
        assert!(roster.values().all(|a| a.name() == "raider"));
    }
}
