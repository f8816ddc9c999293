//! Decoding of replay logs, for viewers and tests.

use std::io::Read;

use crate::error::DecodeError;
use crate::game::{
    Coord, EntityDelta, EntityId, EntityRecord, FlagId, FlagRecord, FlagState, MatchResult,
    RoundEvent, RoundSnapshot, Team, TeamDelta, UpgradeEffect, UpgradeTable, WinReason,
};
use crate::replay::{MAGIC, ROUND_TAG, ReplayHeader, TRAILER_TAG, VERSION};

/// A fully decoded replay.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    /// Header block.
    pub header: ReplayHeader,
    /// Round blocks, in order.
    pub rounds: Vec<RoundSnapshot>,
    /// Trailer, if the match finished.
    pub result: Option<MatchResult>,
}

impl Replay {
    /// Entity and flag records as of the end of `round` (0 = initial).
    ///
    /// Rounds past the end of the log give the final state.
    #[must_use]
    pub fn state_at(&self, round: u32) -> (Vec<EntityRecord>, Vec<FlagRecord>) {
        let mut entities = self.header.entities.clone();
        let mut flags = self.header.flags.clone();
        for snapshot in self.rounds.iter().take_while(|s| s.round <= round) {
            snapshot.apply_to(&mut entities, &mut flags);
        }
        (entities, flags)
    }

    /// Number of round blocks.
    #[must_use]
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }
}

/// Parser over an in-memory replay.
#[derive(Debug, Clone, Copy)]
pub struct ReplayReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ReplayReader<'a> {
    /// Start reading at the first byte.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Decode a complete log held in memory.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] on bad magic, unknown version, truncation or
    /// out-of-domain values.
    pub fn decode(bytes: &[u8]) -> Result<Replay, DecodeError> {
        ReplayReader::new(bytes).read_all()
    }

    /// Read a complete log from a reader.
    ///
    /// # Errors
    ///
    /// As [`ReplayReader::decode`], plus I/O failures.
    pub fn from_reader(mut reader: impl Read) -> Result<Replay, DecodeError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::decode(&bytes)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.offset + N;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(DecodeError::Truncated {
                offset: self.offset,
            })?;
        self.offset = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    fn invalid(&self, field: &'static str, value: u64, width: usize) -> DecodeError {
        DecodeError::InvalidValue {
            field,
            value,
            offset: self.offset - width,
        }
    }

    fn team(&mut self) -> Result<Team, DecodeError> {
        let raw = self.u8()?;
        Team::from_id(raw).ok_or_else(|| self.invalid("team", u64::from(raw), 1))
    }

    fn coord(&mut self) -> Result<Coord, DecodeError> {
        Ok(Coord::new(self.u16()?, self.u16()?))
    }

    fn option(&mut self) -> Result<Option<u32>, DecodeError> {
        let present = self.u8()?;
        let value = self.u32()?;
        match present {
            0 => Ok(None),
            1 => Ok(Some(value)),
            other => Err(self.invalid("presence flag", u64::from(other), 5)),
        }
    }

    /// Guard a count against the bytes left, so a corrupt count cannot
    /// trigger a huge allocation.
    fn count(&mut self, min_record: usize) -> Result<usize, DecodeError> {
        let count = self.u32()? as usize;
        let remaining = self.bytes.len() - self.offset;
        if count.saturating_mul(min_record) > remaining {
            return Err(DecodeError::Truncated {
                offset: self.offset,
            });
        }
        Ok(count)
    }

    fn entity(&mut self) -> Result<EntityRecord, DecodeError> {
        Ok(EntityRecord {
            id: EntityId(self.u32()?),
            team: self.team()?,
            position: self.coord()?,
            health: self.u32()?,
            action_cooldown: self.u32()?,
            movement_cooldown: self.u32()?,
            carried_flag: self.option()?.map(FlagId),
        })
    }

    fn flag(&mut self) -> Result<FlagRecord, DecodeError> {
        let id = FlagId(self.u32()?);
        let team = self.team()?;
        let home = self.coord()?;
        let position = self.coord()?;
        let raw = self.u8()?;
        let state =
            FlagState::from_code(raw).ok_or_else(|| self.invalid("flag state", u64::from(raw), 1))?;
        Ok(FlagRecord {
            id,
            team,
            home,
            position,
            state,
            drop_rounds: self.u32()?,
            carrier: self.option()?.map(EntityId),
        })
    }

    fn upgrade_effect(&mut self) -> Result<UpgradeEffect, DecodeError> {
        Ok(UpgradeEffect::new(self.i32()?, self.i32()?, self.i32()?))
    }

    fn header(&mut self) -> Result<ReplayHeader, DecodeError> {
        if self.take::<4>()? != MAGIC {
            return Err(DecodeError::BadMagic);
        }
        let version = self.u16()?;
        if version != VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let name_len = usize::from(self.u16()?);
        let name_bytes = self
            .bytes
            .get(self.offset..self.offset + name_len)
            .ok_or(DecodeError::Truncated {
                offset: self.offset,
            })?;
        let map_name = String::from_utf8(name_bytes.to_vec()).map_err(|_| DecodeError::BadName)?;
        self.offset += name_len;

        let width = self.u16()?;
        let height = self.u16()?;
        let min_corner = (self.i32()?, self.i32()?);
        let max_corner = (self.i32()?, self.i32()?);
        let seed = self.u64()?;
        let cells = usize::from(width) * usize::from(height);
        if cells.saturating_mul(9) > self.bytes.len() - self.offset {
            return Err(DecodeError::Truncated {
                offset: self.offset,
            });
        }
        let passability = (0..cells)
            .map(|_| self.f64())
            .collect::<Result<Vec<_>, _>>()?;
        let terrain = (0..cells)
            .map(|_| self.u8())
            .collect::<Result<Vec<_>, _>>()?;
        let upgrades = UpgradeTable {
            action: self.upgrade_effect()?,
            healing: self.upgrade_effect()?,
            capturing: self.upgrade_effect()?,
        };
        let max_rounds = self.u32()?;
        let entity_count = self.count(26)?;
        let entities = (0..entity_count)
            .map(|_| self.entity())
            .collect::<Result<Vec<_>, _>>()?;
        let flag_count = self.count(23)?;
        let flags = (0..flag_count)
            .map(|_| self.flag())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReplayHeader {
            map_name,
            width,
            height,
            min_corner,
            max_corner,
            seed,
            passability,
            terrain,
            upgrades,
            max_rounds,
            entities,
            flags,
        })
    }

    fn round(&mut self) -> Result<RoundSnapshot, DecodeError> {
        let round = self.u32()?;

        let entity_count = self.count(5)?;
        let mut entities = Vec::with_capacity(entity_count);
        for _ in 0..entity_count {
            match self.u8()? {
                0 => entities.push(EntityDelta::Updated(self.entity()?)),
                1 => entities.push(EntityDelta::Removed(EntityId(self.u32()?))),
                other => return Err(self.invalid("entity delta kind", u64::from(other), 1)),
            }
        }

        let flag_count = self.count(23)?;
        let flags = (0..flag_count)
            .map(|_| self.flag())
            .collect::<Result<Vec<_>, _>>()?;

        let team_count = self.u8()?;
        let mut teams = Vec::with_capacity(usize::from(team_count));
        for _ in 0..team_count {
            teams.push(TeamDelta {
                team: self.team()?,
                captures: self.u32()?,
                upgrade_points: self.u32()?,
                upgrade_mask: self.u8()?,
            });
        }

        let event_count = self.count(9)?;
        let mut events = Vec::with_capacity(event_count);
        for _ in 0..event_count {
            let kind = self.u8()?;
            let actor = self.u32()?;
            let target = self.i32()?;
            let event = RoundEvent::from_wire(kind, actor, target)
                .ok_or_else(|| self.invalid("event", u64::from(kind), 9))?;
            events.push(event);
        }

        Ok(RoundSnapshot {
            round,
            entities,
            flags,
            teams,
            events,
        })
    }

    fn trailer(&mut self, captures: [u32; 2]) -> Result<MatchResult, DecodeError> {
        let winner = self.team()?;
        let raw = self.u8()?;
        let reason =
            WinReason::from_code(raw).ok_or_else(|| self.invalid("win reason", u64::from(raw), 1))?;
        Ok(MatchResult {
            winner,
            reason,
            rounds: self.u32()?,
            captures,
        })
    }

    /// Decode header, rounds and trailer.
    ///
    /// # Errors
    ///
    /// See [`ReplayReader::decode`].
    pub fn read_all(&mut self) -> Result<Replay, DecodeError> {
        let header = self.header()?;
        let mut rounds = Vec::new();
        let mut captures = [0u32; 2];
        let mut result = None;

        while self.offset < self.bytes.len() {
            match self.u8()? {
                ROUND_TAG => {
                    let snapshot = self.round()?;
                    for team in &snapshot.teams {
                        captures[team.team.index()] = team.captures;
                    }
                    rounds.push(snapshot);
                }
                TRAILER_TAG => {
                    result = Some(self.trailer(captures)?);
                    break;
                }
                other => return Err(self.invalid("block tag", u64::from(other), 1)),
            }
        }

        Ok(Replay {
            header,
            rounds,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{ReplayWriter, encode_header};

    fn header() -> ReplayHeader {
        ReplayHeader {
            map_name: "decode".to_string(),
            width: 2,
            height: 2,
            min_corner: (-1, -1),
            max_corner: (1, 1),
            seed: 42,
            passability: vec![1.0, 0.25, 0.5, 1.0],
            terrain: vec![2, 0, 0, 3],
            upgrades: UpgradeTable::default(),
            max_rounds: 5,
            entities: vec![EntityRecord {
                id: EntityId(1),
                team: Team::A,
                position: Coord::new(0, 0),
                health: 100,
                action_cooldown: 0,
                movement_cooldown: 0,
                carried_flag: None,
            }],
            flags: vec![FlagRecord {
                id: FlagId(1),
                team: Team::B,
                home: Coord::new(1, 1),
                position: Coord::new(1, 1),
                state: FlagState::AtHome,
                drop_rounds: 0,
                carrier: None,
            }],
        }
    }

    #[test]
    fn test_full_log_decodes() {
        let mut writer = ReplayWriter::new(Vec::new());
        writer.write_header(&header()).unwrap();
        let moved = EntityRecord {
            position: Coord::new(1, 0),
            movement_cooldown: 10,
            ..header().entities[0]
        };
        writer
            .write_round(&RoundSnapshot {
                round: 1,
                entities: vec![EntityDelta::Updated(moved)],
                teams: vec![TeamDelta {
                    team: Team::A,
                    captures: 1,
                    upgrade_points: 0,
                    upgrade_mask: 0,
                }],
                ..RoundSnapshot::default()
            })
            .unwrap();
        writer
            .finish(&MatchResult {
                winner: Team::A,
                reason: WinReason::FlagsCaptured,
                rounds: 1,
                captures: [1, 0],
            })
            .unwrap();

        let replay = ReplayReader::decode(&writer.into_inner()).unwrap();
        assert_eq!(replay.header, header());
        assert_eq!(replay.round_count(), 1);
        let result = replay.result.unwrap();
        assert_eq!(result.captures, [1, 0]);
        assert_eq!(result.reason, WinReason::FlagsCaptured);

        let (before, _) = replay.state_at(0);
        let (after, flags) = replay.state_at(1);
        assert_eq!(before[0].position, Coord::new(0, 0));
        assert_eq!(after[0], moved);
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn test_bad_magic_and_version() {
        assert!(matches!(
            ReplayReader::decode(b"NOPE\x01\x00"),
            Err(DecodeError::BadMagic)
        ));
        let mut bytes = encode_header(&header()).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            ReplayReader::decode(&bytes),
            Err(DecodeError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_truncation_reported() {
        let bytes = encode_header(&header()).unwrap();
        for cut in [3, 10, bytes.len() - 1] {
            assert!(
                matches!(
                    ReplayReader::decode(&bytes[..cut]),
                    Err(DecodeError::Truncated { .. } | DecodeError::BadMagic)
                ),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_unknown_block_tag() {
        let mut bytes = encode_header(&header()).unwrap();
        bytes.push(0x99);
        assert!(matches!(
            ReplayReader::decode(&bytes),
            Err(DecodeError::InvalidValue {
                field: "block tag",
                value: 0x99,
                ..
            })
        ));
    }
}
