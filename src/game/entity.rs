//! Entity state store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::{Coord, FlagId};

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// First team (id 1).
    A,
    /// Second team (id 2).
    B,
}

impl Team {
    /// Both teams, in id order.
    pub const ALL: [Team; 2] = [Team::A, Team::B];

    /// Numeric team id used on the wire and in results.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Team::A => 1,
            Team::B => 2,
        }
    }

    /// Parse a numeric team id.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Team::A),
            2 => Some(Team::B),
            _ => None,
        }
    }

    /// The other team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }

    /// Index into per-team arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Team::A => 0,
            Team::B => 1,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::A => write!(f, "A"),
            Team::B => write!(f, "B"),
        }
    }
}

/// Unique identifier of an entity within a match. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mutable per-agent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// Owning team.
    pub team: Team,
    /// Current cell.
    pub position: Coord,
    /// Hit points; 0 means dead.
    pub health: u32,
    /// Action cooldown in hundredths of a round.
    pub action_cooldown: u32,
    /// Movement cooldown in hundredths of a round.
    pub movement_cooldown: u32,
    /// Flag currently carried. Non-owning: the flag record holds the link.
    pub carried_flag: Option<FlagId>,
    /// False once health hits 0; the entity is removed at the end of the round.
    pub alive: bool,
}

impl Entity {
    /// Apply damage, flooring at zero. Returns true if this killed the entity.
    pub fn take_damage(&mut self, damage: u32) -> bool {
        if !self.alive {
            return false;
        }
        self.health = self.health.saturating_sub(damage);
        if self.health == 0 {
            self.alive = false;
            true
        } else {
            false
        }
    }

    /// Restore health up to `max_health`. Returns the amount actually healed.
    pub fn heal(&mut self, amount: u32, max_health: u32) -> u32 {
        let healed = amount.min(max_health.saturating_sub(self.health));
        self.health += healed;
        healed
    }
}

/// Owner of all entity records of a match.
///
/// Iteration is always in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u32,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Create an empty store. The first spawned entity gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a new entity with the next id.
    pub fn spawn(&mut self, team: Team, position: Coord, health: u32) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(
            id,
            Entity {
                id,
                team,
                position,
                health,
                action_cooldown: 0,
                movement_cooldown: 0,
                carried_flag: None,
                alive: health > 0,
            },
        );
        id
    }

    /// Get an entity by id (alive or not yet removed).
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable entity by id.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Get a live entity by id.
    #[must_use]
    pub fn live(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).filter(|e| e.alive)
    }

    /// All entities, ascending id.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All entities mutably, ascending id.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Live entities, ascending id.
    pub fn alive(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.alive)
    }

    /// Ids of live entities, ascending.
    #[must_use]
    pub fn live_ids(&self) -> Vec<EntityId> {
        self.alive().map(|e| e.id).collect()
    }

    /// Number of live entities on a team.
    #[must_use]
    pub fn live_count(&self, team: Team) -> u32 {
        let count = self.alive().filter(|e| e.team == team).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Total health of a team's live entities.
    #[must_use]
    pub fn total_health(&self, team: Team) -> u64 {
        self.alive()
            .filter(|e| e.team == team)
            .map(|e| u64::from(e.health))
            .sum()
    }

    /// The live entity standing on a cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: Coord) -> Option<&Entity> {
        self.alive().find(|e| e.position == cell)
    }

    /// Drop every dead entity from the store. Returns the removed ids, ascending.
    pub fn remove_dead(&mut self) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| !e.alive)
            .map(|e| e.id)
            .collect();
        for id in &dead {
            self.entities.remove(id);
        }
        dead
    }

    /// Number of records (including dead ones not yet removed).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let mut store = EntityStore::new();
        let a = store.spawn(Team::A, Coord::new(0, 0), 100);
        let b = store.spawn(Team::B, Coord::new(1, 0), 100);
        assert_eq!(a, EntityId(1));
        assert_eq!(b, EntityId(2));

        store.get_mut(b).unwrap().take_damage(100);
        assert_eq!(store.remove_dead(), vec![b]);

        let c = store.spawn(Team::B, Coord::new(2, 0), 100);
        assert_eq!(c, EntityId(3));
    }

    #[test]
    fn test_damage_floors_at_zero() {
        let mut store = EntityStore::new();
        let id = store.spawn(Team::A, Coord::new(0, 0), 100);
        let entity = store.get_mut(id).unwrap();
        assert!(!entity.take_damage(60));
        assert_eq!(entity.health, 40);
        assert!(entity.take_damage(60));
        assert_eq!(entity.health, 0);
        assert!(!entity.alive);
        // Already dead: no second kill
        assert!(!entity.take_damage(10));
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut store = EntityStore::new();
        let id = store.spawn(Team::A, Coord::new(0, 0), 90);
        let entity = store.get_mut(id).unwrap();
        assert_eq!(entity.heal(50, 100), 10);
        assert_eq!(entity.health, 100);
    }

    #[test]
    fn test_occupant_ignores_dead() {
        let mut store = EntityStore::new();
        let id = store.spawn(Team::A, Coord::new(1, 1), 10);
        assert_eq!(store.occupant(Coord::new(1, 1)).map(|e| e.id), Some(id));
        store.get_mut(id).unwrap().take_damage(10);
        assert!(store.occupant(Coord::new(1, 1)).is_none());
        assert!(store.live(id).is_none());
        assert!(store.get(id).is_some());
    }

    #[test]
    fn test_team_helpers() {
        assert_eq!(Team::A.opponent(), Team::B);
        assert_eq!(Team::from_id(Team::B.id()), Some(Team::B));
        assert_eq!(Team::from_id(0), None);

        let mut store = EntityStore::new();
        store.spawn(Team::A, Coord::new(0, 0), 10);
        store.spawn(Team::A, Coord::new(1, 0), 20);
        store.spawn(Team::B, Coord::new(2, 0), 5);
        assert_eq!(store.live_count(Team::A), 2);
        assert_eq!(store.total_health(Team::A), 30);
        assert_eq!(store.total_health(Team::B), 5);
    }
}
