//! Flag records and their lifecycle.
//!
//! A flag owns the forward link to its carrier. The carrier's
//! `carried_flag` field is a plain id pointing back; neither side owns the
//! other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::game::{Coord, EntityId, Team};

/// Unique identifier of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlagId(pub u32);

impl std::fmt::Display for FlagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "flag {}", self.0)
    }
}

/// Where a flag is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FlagState {
    /// Resting at its home cell.
    AtHome = 0,
    /// Held by an entity of the opposing team.
    Carried = 1,
    /// Lying where its carrier dropped it, counting down to auto-return.
    Dropped = 2,
    /// Brought to the capturing team's spawn zone. Out of play for good.
    Captured = 3,
}

impl FlagState {
    /// Check if an entity may pick the flag up in this state.
    #[must_use]
    pub const fn is_pickable(self) -> bool {
        matches!(self, FlagState::AtHome | FlagState::Dropped)
    }

    /// Wire code used in replays.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FlagState::AtHome),
            1 => Some(FlagState::Carried),
            2 => Some(FlagState::Dropped),
            3 => Some(FlagState::Captured),
            _ => None,
        }
    }
}

/// A capture objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    /// Unique identifier.
    pub id: FlagId,
    /// Owning team. The opponent scores by capturing it.
    pub team: Team,
    /// Cell the flag returns to.
    pub home: Coord,
    /// Current cell (the carrier's cell while carried).
    pub position: Coord,
    /// Lifecycle state.
    pub state: FlagState,
    /// Rounds left before a dropped flag returns home.
    pub drop_rounds: u32,
    /// Entity carrying the flag.
    pub carrier: Option<EntityId>,
}

impl Flag {
    /// A flag resting at home.
    #[must_use]
    pub const fn new(id: FlagId, team: Team, home: Coord) -> Self {
        Self {
            id,
            team,
            home,
            position: home,
            state: FlagState::AtHome,
            drop_rounds: 0,
            carrier: None,
        }
    }

    /// Attach the flag to a carrier standing on `position`.
    pub fn pick_up(&mut self, carrier: EntityId, position: Coord) {
        self.state = FlagState::Carried;
        self.carrier = Some(carrier);
        self.position = position;
        self.drop_rounds = 0;
    }

    /// Leave the flag on `position` with a return timer of `delay` rounds.
    pub fn drop_at(&mut self, position: Coord, delay: u32) {
        self.state = FlagState::Dropped;
        self.carrier = None;
        self.position = position;
        self.drop_rounds = delay;
    }

    /// Put the flag back on its home cell.
    pub fn return_home(&mut self) {
        self.state = FlagState::AtHome;
        self.carrier = None;
        self.position = self.home;
        self.drop_rounds = 0;
    }

    /// Mark the flag captured at `position`.
    pub fn capture(&mut self, position: Coord) {
        self.state = FlagState::Captured;
        self.carrier = None;
        self.position = position;
        self.drop_rounds = 0;
    }

    /// Count one round down on a dropped flag. Returns true if it went home.
    pub fn tick_return(&mut self) -> bool {
        if self.state != FlagState::Dropped {
            return false;
        }
        self.drop_rounds = self.drop_rounds.saturating_sub(1);
        if self.drop_rounds == 0 {
            self.return_home();
            true
        } else {
            false
        }
    }
}

/// Owner of all flag records of a match, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTable {
    flags: BTreeMap<FlagId, Flag>,
}

impl FlagTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flag at its home cell.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateFlag`] if the id is already used.
    pub fn insert(&mut self, id: FlagId, team: Team, home: Coord) -> Result<(), ConfigError> {
        if self.flags.contains_key(&id) {
            return Err(ConfigError::DuplicateFlag(id));
        }
        self.flags.insert(id, Flag::new(id, team, home));
        Ok(())
    }

    /// Get a flag by id.
    #[must_use]
    pub fn get(&self, id: FlagId) -> Option<&Flag> {
        self.flags.get(&id)
    }

    /// Get a mutable flag by id.
    #[must_use]
    pub fn get_mut(&mut self, id: FlagId) -> Option<&mut Flag> {
        self.flags.get_mut(&id)
    }

    /// All flags, ascending id.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    /// All flags mutably, ascending id.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Flag> {
        self.flags.values_mut()
    }

    /// Number of flags owned by a team.
    #[must_use]
    pub fn owned_by(&self, team: Team) -> u32 {
        let count = self.flags.values().filter(|f| f.team == team).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Number of flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// True if there are no flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_then_return_after_delay() {
        let mut flag = Flag::new(FlagId(1), Team::B, Coord::new(0, 0));
        flag.pick_up(EntityId(1), Coord::new(0, 0));
        flag.drop_at(Coord::new(3, 3), 4);
        assert_eq!(flag.state, FlagState::Dropped);
        assert_eq!(flag.carrier, None);

        assert!(!flag.tick_return());
        assert!(!flag.tick_return());
        assert!(!flag.tick_return());
        assert_eq!(flag.position, Coord::new(3, 3));
        assert!(flag.tick_return());
        assert_eq!(flag.state, FlagState::AtHome);
        assert_eq!(flag.position, Coord::new(0, 0));
    }

    #[test]
    fn test_tick_only_affects_dropped() {
        let mut flag = Flag::new(FlagId(1), Team::A, Coord::new(2, 2));
        assert!(!flag.tick_return());
        assert_eq!(flag.state, FlagState::AtHome);

        flag.pick_up(EntityId(4), Coord::new(2, 2));
        assert!(!flag.tick_return());
        assert_eq!(flag.state, FlagState::Carried);
    }

    #[test]
    fn test_pickable_states() {
        assert!(FlagState::AtHome.is_pickable());
        assert!(FlagState::Dropped.is_pickable());
        assert!(!FlagState::Carried.is_pickable());
        assert!(!FlagState::Captured.is_pickable());
    }

    #[test]
    fn test_duplicate_flag_rejected() {
        let mut table = FlagTable::new();
        table.insert(FlagId(1), Team::A, Coord::new(0, 0)).unwrap();
        assert_eq!(
            table.insert(FlagId(1), Team::B, Coord::new(1, 1)),
            Err(ConfigError::DuplicateFlag(FlagId(1)))
        );
        assert_eq!(table.owned_by(Team::A), 1);
        assert_eq!(table.owned_by(Team::B), 0);
    }
}
