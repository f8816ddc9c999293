//! Agent boundary.
//!
//! An agent decides one entity's action per round from a read-only view of
//! the committed state. Agents run concurrently, so they only ever see
//! shared references; the resolver is the sole writer.
//!
//! Compute is metered with a [`Budget`] of fuel units that the agent charges
//! as it works. Running out is not an error for the match: the entity simply
//! does nothing that round.

pub mod bots;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::game::{
    Action, ActionRequest, Entity, EntityId, Flag, GlobalUpgrade, Grid, MatchState, RuleConfig,
    Team, TeamLedger, validate_pending,
};

/// Default fuel per agent per round.
pub const DEFAULT_FUEL_BUDGET: u64 = 10_000;

/// The agent tried to spend more fuel than it had left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("compute budget of {limit} units exhausted")]
pub struct BudgetExhausted {
    /// The per-round limit.
    pub limit: u64,
}

/// Deterministic per-round compute allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    limit: u64,
    used: u64,
}

impl Budget {
    /// A fresh budget of `limit` units.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Spend `units`.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetExhausted`] if this would exceed the limit. The budget
    /// is then fully used.
    pub fn charge(&mut self, units: u64) -> Result<(), BudgetExhausted> {
        match self.used.checked_add(units) {
            Some(total) if total <= self.limit => {
                self.used = total;
                Ok(())
            }
            _ => {
                self.used = self.limit;
                Err(BudgetExhausted { limit: self.limit })
            }
        }
    }

    /// Units spent so far.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.used
    }

    /// Units still available.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(DEFAULT_FUEL_BUDGET)
    }
}

/// Read-only window on the committed state for one entity.
#[derive(Debug, Clone, Copy)]
pub struct AgentView<'a> {
    state: &'a MatchState,
    rules: &'a RuleConfig,
    me: &'a Entity,
}

impl<'a> AgentView<'a> {
    /// View for `entity`, or `None` if it is not alive.
    #[must_use]
    pub fn new(state: &'a MatchState, rules: &'a RuleConfig, entity: EntityId) -> Option<Self> {
        let me = state.entities.live(entity)?;
        Some(Self { state, rules, me })
    }

    /// The acting entity.
    #[must_use]
    pub const fn me(&self) -> &'a Entity {
        self.me
    }

    /// Round about to be resolved.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.state.round + 1
    }

    /// The map.
    #[must_use]
    pub fn grid(&self) -> &'a Grid {
        &self.state.grid
    }

    /// Rule constants.
    #[must_use]
    pub const fn rules(&self) -> &'a RuleConfig {
        self.rules
    }

    /// Live entities, ascending id.
    pub fn entities(&self) -> impl Iterator<Item = &'a Entity> + 'a {
        self.state.entities.alive()
    }

    /// Live entities of the other team.
    pub fn enemies(&self) -> impl Iterator<Item = &'a Entity> + 'a {
        let team = self.me.team;
        self.state.entities.alive().filter(move |e| e.team != team)
    }

    /// Live entities of the own team, including the acting one.
    pub fn allies(&self) -> impl Iterator<Item = &'a Entity> + 'a {
        let team = self.me.team;
        self.state.entities.alive().filter(move |e| e.team == team)
    }

    /// All flags.
    pub fn flags(&self) -> impl Iterator<Item = &'a Flag> + 'a {
        self.state.flags.iter()
    }

    /// Ledger of a team.
    #[must_use]
    pub const fn ledger(&self, team: Team) -> &'a TeamLedger {
        self.state.ledger(team)
    }

    /// Check if a team holds an upgrade.
    #[must_use]
    pub fn has_upgrade(&self, team: Team, upgrade: GlobalUpgrade) -> bool {
        self.state.upgrades.is_active(team, upgrade)
    }

    /// Would `action` pass validation against the committed state?
    ///
    /// Counts the upgrade point the coming round grants. Actions of other
    /// entities in the same round can still make it fail.
    #[must_use]
    pub fn can(&self, action: Action) -> bool {
        validate_pending(self.state, self.rules, &ActionRequest::new(self.me.id, action)).is_ok()
    }
}

/// Agents by the entity they control.
pub type Roster = BTreeMap<EntityId, Box<dyn Agent>>;

/// Decision logic for one entity.
///
/// Implementations must be deterministic: the same view and budget must
/// always produce the same action.
pub trait Agent: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Choose this round's action.
    ///
    /// # Errors
    ///
    /// Propagate [`BudgetExhausted`] from [`Budget::charge`]; the entity
    /// then does nothing this round.
    fn act(&mut self, view: &AgentView<'_>, budget: &mut Budget)
    -> Result<Action, BudgetExhausted>;
}
