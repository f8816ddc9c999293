//! Immutable per-round deltas, the unit the replay log is built from.

use serde::{Deserialize, Serialize};

use crate::game::{
    Coord, Entity, EntityId, Flag, FlagId, FlagState, GlobalUpgrade, MatchState, Team,
};

/// Persisted view of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity id.
    pub id: EntityId,
    /// Owning team.
    pub team: Team,
    /// Cell.
    pub position: Coord,
    /// Hit points.
    pub health: u32,
    /// Action cooldown.
    pub action_cooldown: u32,
    /// Movement cooldown.
    pub movement_cooldown: u32,
    /// Carried flag.
    pub carried_flag: Option<FlagId>,
}

impl From<&Entity> for EntityRecord {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            team: entity.team,
            position: entity.position,
            health: entity.health,
            action_cooldown: entity.action_cooldown,
            movement_cooldown: entity.movement_cooldown,
            carried_flag: entity.carried_flag,
        }
    }
}

/// Change to one entity within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityDelta {
    /// New or changed record.
    Updated(EntityRecord),
    /// The entity died and was removed.
    Removed(EntityId),
}

impl EntityDelta {
    /// Id of the entity this delta is about.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        match self {
            EntityDelta::Updated(record) => record.id,
            EntityDelta::Removed(id) => *id,
        }
    }
}

/// Persisted view of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRecord {
    /// Flag id.
    pub id: FlagId,
    /// Owning team.
    pub team: Team,
    /// Home cell.
    pub home: Coord,
    /// Current cell.
    pub position: Coord,
    /// Lifecycle state.
    pub state: FlagState,
    /// Rounds until a dropped flag returns.
    pub drop_rounds: u32,
    /// Carrying entity.
    pub carrier: Option<EntityId>,
}

impl From<&Flag> for FlagRecord {
    fn from(flag: &Flag) -> Self {
        Self {
            id: flag.id,
            team: flag.team,
            home: flag.home,
            position: flag.position,
            state: flag.state,
            drop_rounds: flag.drop_rounds,
            carrier: flag.carrier,
        }
    }
}

/// A team's ledger and upgrades after a round in which they changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamDelta {
    /// Team.
    pub team: Team,
    /// Total captures.
    pub captures: u32,
    /// Unspent upgrade points.
    pub upgrade_points: u32,
    /// Active upgrades as a bitmask of [`GlobalUpgrade::bit`].
    pub upgrade_mask: u8,
}

impl TeamDelta {
    /// Current values for `team` in `state`.
    #[must_use]
    pub fn of(state: &MatchState, team: Team) -> Self {
        let ledger = state.ledger(team);
        Self {
            team,
            captures: ledger.captures,
            upgrade_points: ledger.upgrade_points,
            upgrade_mask: state.upgrades.mask(team),
        }
    }
}

/// Something that happened during a round, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEvent {
    /// An attack landed.
    Attack {
        /// Attacker.
        attacker: EntityId,
        /// Victim.
        target: EntityId,
    },
    /// A heal landed.
    Heal {
        /// Healer.
        healer: EntityId,
        /// Healed entity.
        target: EntityId,
    },
    /// A flag was picked up.
    Pickup {
        /// New carrier.
        entity: EntityId,
        /// The flag.
        flag: FlagId,
    },
    /// A flag was dropped, voluntarily or on death.
    Drop {
        /// Former carrier.
        entity: EntityId,
        /// The flag.
        flag: FlagId,
    },
    /// A flag reached the carrier's spawn zone.
    Capture {
        /// Carrier.
        entity: EntityId,
        /// The flag.
        flag: FlagId,
    },
    /// A dropped flag went back home.
    Return {
        /// The flag.
        flag: FlagId,
    },
    /// An entity's health reached zero.
    Death {
        /// The entity.
        entity: EntityId,
    },
    /// A team bought an upgrade.
    UpgradePurchase {
        /// Buying team.
        team: Team,
        /// The upgrade.
        upgrade: GlobalUpgrade,
    },
}

impl RoundEvent {
    /// Wire triple `(kind, actor, target)`; target is -1 when unused.
    #[must_use]
    pub fn to_wire(&self) -> (u8, u32, i32) {
        fn signed(id: u32) -> i32 {
            i32::try_from(id).unwrap_or(i32::MAX)
        }
        match *self {
            RoundEvent::Attack { attacker, target } => (0, attacker.0, signed(target.0)),
            RoundEvent::Heal { healer, target } => (1, healer.0, signed(target.0)),
            RoundEvent::Pickup { entity, flag } => (2, entity.0, signed(flag.0)),
            RoundEvent::Drop { entity, flag } => (3, entity.0, signed(flag.0)),
            RoundEvent::Capture { entity, flag } => (4, entity.0, signed(flag.0)),
            RoundEvent::Return { flag } => (5, flag.0, -1),
            RoundEvent::Death { entity } => (6, entity.0, -1),
            RoundEvent::UpgradePurchase { team, upgrade } => {
                (7, u32::from(team.id()), i32::from(upgrade.code()))
            }
        }
    }

    /// Parse a wire triple.
    #[must_use]
    pub fn from_wire(kind: u8, actor: u32, target: i32) -> Option<Self> {
        let id = || u32::try_from(target).ok();
        Some(match kind {
            0 => RoundEvent::Attack {
                attacker: EntityId(actor),
                target: EntityId(id()?),
            },
            1 => RoundEvent::Heal {
                healer: EntityId(actor),
                target: EntityId(id()?),
            },
            2 => RoundEvent::Pickup {
                entity: EntityId(actor),
                flag: FlagId(id()?),
            },
            3 => RoundEvent::Drop {
                entity: EntityId(actor),
                flag: FlagId(id()?),
            },
            4 => RoundEvent::Capture {
                entity: EntityId(actor),
                flag: FlagId(id()?),
            },
            5 => RoundEvent::Return {
                flag: FlagId(actor),
            },
            6 => RoundEvent::Death {
                entity: EntityId(actor),
            },
            7 => RoundEvent::UpgradePurchase {
                team: Team::from_id(u8::try_from(actor).ok()?)?,
                upgrade: GlobalUpgrade::from_code(u8::try_from(target).ok()?)?,
            },
            _ => return None,
        })
    }
}

/// Everything that changed in one committed round.
///
/// Entity deltas, flag records and team deltas are in ascending id order;
/// events are in resolution order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// Round number, starting at 1.
    pub round: u32,
    /// Changed or removed entities.
    pub entities: Vec<EntityDelta>,
    /// Changed flags.
    pub flags: Vec<FlagRecord>,
    /// Changed team ledgers.
    pub teams: Vec<TeamDelta>,
    /// Events.
    pub events: Vec<RoundEvent>,
}

impl RoundSnapshot {
    /// Compute the deltas between two states.
    #[must_use]
    pub fn diff(before: &MatchState, after: &MatchState, events: Vec<RoundEvent>) -> Self {
        let mut entities = Vec::new();
        for entity in before.entities.iter() {
            if after.entities.get(entity.id).is_none() {
                entities.push(EntityDelta::Removed(entity.id));
            }
        }
        for entity in after.entities.iter() {
            let record = EntityRecord::from(entity);
            let changed = before
                .entities
                .get(entity.id)
                .is_none_or(|old| EntityRecord::from(old) != record);
            if changed {
                entities.push(EntityDelta::Updated(record));
            }
        }
        entities.sort_by_key(EntityDelta::id);

        let flags = after
            .flags
            .iter()
            .filter(|flag| before.flags.get(flag.id) != Some(*flag))
            .map(FlagRecord::from)
            .collect();

        let teams = Team::ALL
            .into_iter()
            .map(|team| TeamDelta::of(after, team))
            .filter(|delta| TeamDelta::of(before, delta.team) != *delta)
            .collect();

        Self {
            round: after.round,
            entities,
            flags,
            teams,
            events,
        }
    }

    /// Apply these deltas to a set of records, as a replay viewer does.
    pub fn apply_to(&self, entities: &mut Vec<EntityRecord>, flags: &mut Vec<FlagRecord>) {
        for delta in &self.entities {
            match delta {
                EntityDelta::Updated(record) => {
                    match entities.binary_search_by_key(&record.id, |e| e.id) {
                        Ok(idx) => entities[idx] = *record,
                        Err(idx) => entities.insert(idx, *record),
                    }
                }
                EntityDelta::Removed(id) => entities.retain(|e| e.id != *id),
            }
        }
        for record in &self.flags {
            match flags.binary_search_by_key(&record.id, |f| f.id) {
                Ok(idx) => flags[idx] = *record,
                Err(idx) => flags.insert(idx, *record),
            }
        }
    }
}
