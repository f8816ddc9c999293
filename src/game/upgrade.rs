//! Global upgrades: permanent team-wide modifiers to the base rules.
//!
//! Effects are kept as deltas and summed on demand. The base constants in
//! [`RuleConfig`](crate::game::RuleConfig) are never touched.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::game::Team;

/// The named upgrades a team can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GlobalUpgrade {
    /// Faster cooldown recovery.
    Action,
    /// Stronger heals.
    Healing,
    /// Dropped enemy flags stay out longer before returning home.
    Capturing,
}

impl GlobalUpgrade {
    /// Every upgrade, in wire order.
    pub const ALL: [GlobalUpgrade; 3] = [
        GlobalUpgrade::Action,
        GlobalUpgrade::Healing,
        GlobalUpgrade::Capturing,
    ];

    /// Bit used in the replay's upgrade mask.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            GlobalUpgrade::Action => 1,
            GlobalUpgrade::Healing => 1 << 1,
            GlobalUpgrade::Capturing => 1 << 2,
        }
    }

    /// Wire code used in replay events.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            GlobalUpgrade::Action => 0,
            GlobalUpgrade::Healing => 1,
            GlobalUpgrade::Capturing => 2,
        }
    }

    /// Parse a wire code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GlobalUpgrade::Action),
            1 => Some(GlobalUpgrade::Healing),
            2 => Some(GlobalUpgrade::Capturing),
            _ => None,
        }
    }
}

/// Numeric effect of one upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpgradeEffect {
    /// Added to the per-round cooldown reduction.
    pub cooldown_reduction: i32,
    /// Added to the base heal amount.
    pub base_heal: i32,
    /// Added to the dropped-flag return delay, in rounds.
    pub flag_return_delay: i32,
}

impl UpgradeEffect {
    /// Create an effect from its three deltas.
    #[must_use]
    pub const fn new(cooldown_reduction: i32, base_heal: i32, flag_return_delay: i32) -> Self {
        Self {
            cooldown_reduction,
            base_heal,
            flag_return_delay,
        }
    }
}

/// Immutable table of upgrade effects, fixed for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeTable {
    /// Effect of [`GlobalUpgrade::Action`].
    pub action: UpgradeEffect,
    /// Effect of [`GlobalUpgrade::Healing`].
    pub healing: UpgradeEffect,
    /// Effect of [`GlobalUpgrade::Capturing`].
    pub capturing: UpgradeEffect,
}

impl Default for UpgradeTable {
    fn default() -> Self {
        Self {
            action: UpgradeEffect::new(4, 0, 0),
            healing: UpgradeEffect::new(0, 50, 0),
            capturing: UpgradeEffect::new(0, 0, 8),
        }
    }
}

impl UpgradeTable {
    /// Effect of one upgrade.
    #[must_use]
    pub const fn effect(&self, upgrade: GlobalUpgrade) -> UpgradeEffect {
        match upgrade {
            GlobalUpgrade::Action => self.action,
            GlobalUpgrade::Healing => self.healing,
            GlobalUpgrade::Capturing => self.capturing,
        }
    }
}

/// Per-team set of active upgrades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRegistry {
    table: UpgradeTable,
    active: [BTreeSet<GlobalUpgrade>; 2],
}

impl UpgradeRegistry {
    /// Create a registry with no active upgrades.
    #[must_use]
    pub fn new(table: UpgradeTable) -> Self {
        Self {
            table,
            active: [BTreeSet::new(), BTreeSet::new()],
        }
    }

    /// The effect table this registry was built with.
    #[must_use]
    pub const fn table(&self) -> &UpgradeTable {
        &self.table
    }

    /// Activate an upgrade for a team.
    ///
    /// Idempotent: returns `false` and changes nothing if it was already active.
    pub fn activate(&mut self, team: Team, upgrade: GlobalUpgrade) -> bool {
        self.active[team.index()].insert(upgrade)
    }

    /// Check if a team holds an upgrade.
    #[must_use]
    pub fn is_active(&self, team: Team, upgrade: GlobalUpgrade) -> bool {
        self.active[team.index()].contains(&upgrade)
    }

    /// A team's active upgrades, in ascending order.
    pub fn active(&self, team: Team) -> impl Iterator<Item = GlobalUpgrade> + '_ {
        self.active[team.index()].iter().copied()
    }

    /// Bitmask of a team's active upgrades (see [`GlobalUpgrade::bit`]).
    #[must_use]
    pub fn mask(&self, team: Team) -> u8 {
        self.active(team).fold(0, |mask, u| mask | u.bit())
    }

    fn sum(&self, team: Team, field: fn(UpgradeEffect) -> i32) -> i32 {
        self.active(team)
            .map(|u| field(self.table.effect(u)))
            .fold(0, i32::saturating_add)
    }

    /// Total cooldown-reduction delta for a team.
    #[must_use]
    pub fn effective_cooldown_reduction(&self, team: Team) -> i32 {
        self.sum(team, |e| e.cooldown_reduction)
    }

    /// Total base-heal delta for a team.
    #[must_use]
    pub fn effective_heal_change(&self, team: Team) -> i32 {
        self.sum(team, |e| e.base_heal)
    }

    /// Total flag-return-delay delta for a team.
    #[must_use]
    pub fn effective_flag_return_delay_change(&self, team: Team) -> i32 {
        self.sum(team, |e| e.flag_return_delay)
    }
}

/// Add a signed delta to a base constant, clamping at zero.
#[must_use]
pub fn apply_delta(base: u32, delta: i32) -> u32 {
    if delta >= 0 {
        base.saturating_add(delta.unsigned_abs())
    } else {
        base.saturating_sub(delta.unsigned_abs())
    }
}
