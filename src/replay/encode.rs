//! Encoding of replay blocks.

use std::io::Write;

use tracing::error;

use crate::error::EncodingError;
use crate::game::{EntityDelta, EntityRecord, FlagRecord, MatchResult, RoundSnapshot};
use crate::replay::{MAGIC, ROUND_TAG, ReplayHeader, TRAILER_TAG, VERSION};

fn count_u32(what: &'static str, len: usize) -> Result<u32, EncodingError> {
    u32::try_from(len).map_err(|_| EncodingError::TooLong { what, len })
}

fn put_option(buf: &mut Vec<u8>, value: Option<u32>) {
    buf.push(u8::from(value.is_some()));
    buf.extend_from_slice(&value.unwrap_or(0).to_le_bytes());
}

fn put_entity(buf: &mut Vec<u8>, record: &EntityRecord) {
    buf.extend_from_slice(&record.id.0.to_le_bytes());
    buf.push(record.team.id());
    buf.extend_from_slice(&record.position.x.to_le_bytes());
    buf.extend_from_slice(&record.position.y.to_le_bytes());
    buf.extend_from_slice(&record.health.to_le_bytes());
    buf.extend_from_slice(&record.action_cooldown.to_le_bytes());
    buf.extend_from_slice(&record.movement_cooldown.to_le_bytes());
    put_option(buf, record.carried_flag.map(|f| f.0));
}

fn put_flag(buf: &mut Vec<u8>, record: &FlagRecord) {
    buf.extend_from_slice(&record.id.0.to_le_bytes());
    buf.push(record.team.id());
    buf.extend_from_slice(&record.home.x.to_le_bytes());
    buf.extend_from_slice(&record.home.y.to_le_bytes());
    buf.extend_from_slice(&record.position.x.to_le_bytes());
    buf.extend_from_slice(&record.position.y.to_le_bytes());
    buf.push(record.state.code());
    buf.extend_from_slice(&record.drop_rounds.to_le_bytes());
    put_option(buf, record.carrier.map(|e| e.0));
}

/// Encode the header block.
///
/// # Errors
///
/// Returns [`EncodingError::TooLong`] if the map name or a record list does
/// not fit its length prefix.
pub fn encode_header(header: &ReplayHeader) -> Result<Vec<u8>, EncodingError> {
    let mut buf = Vec::with_capacity(64 + header.passability.len() * 9);
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());

    let name = header.map_name.as_bytes();
    let name_len = u16::try_from(name.len()).map_err(|_| EncodingError::TooLong {
        what: "map name",
        len: name.len(),
    })?;
    buf.extend_from_slice(&name_len.to_le_bytes());
    buf.extend_from_slice(name);

    buf.extend_from_slice(&header.width.to_le_bytes());
    buf.extend_from_slice(&header.height.to_le_bytes());
    for corner in [header.min_corner, header.max_corner] {
        buf.extend_from_slice(&corner.0.to_le_bytes());
        buf.extend_from_slice(&corner.1.to_le_bytes());
    }
    buf.extend_from_slice(&header.seed.to_le_bytes());
    for p in &header.passability {
        buf.extend_from_slice(&p.to_le_bytes());
    }
    buf.extend_from_slice(&header.terrain);

    for effect in [
        header.upgrades.action,
        header.upgrades.healing,
        header.upgrades.capturing,
    ] {
        buf.extend_from_slice(&effect.cooldown_reduction.to_le_bytes());
        buf.extend_from_slice(&effect.base_heal.to_le_bytes());
        buf.extend_from_slice(&effect.flag_return_delay.to_le_bytes());
    }
    buf.extend_from_slice(&header.max_rounds.to_le_bytes());

    buf.extend_from_slice(&count_u32("initial entities", header.entities.len())?.to_le_bytes());
    for record in &header.entities {
        put_entity(&mut buf, record);
    }
    buf.extend_from_slice(&count_u32("initial flags", header.flags.len())?.to_le_bytes());
    for record in &header.flags {
        put_flag(&mut buf, record);
    }
    Ok(buf)
}

/// Encode one round block.
///
/// # Errors
///
/// Returns [`EncodingError::TooLong`] if a list does not fit its length prefix.
pub fn encode_round(snapshot: &RoundSnapshot) -> Result<Vec<u8>, EncodingError> {
    let mut buf = Vec::with_capacity(
        16 + snapshot.entities.len() * 28 + snapshot.flags.len() * 23 + snapshot.events.len() * 9,
    );
    buf.push(ROUND_TAG);
    buf.extend_from_slice(&snapshot.round.to_le_bytes());

    buf.extend_from_slice(&count_u32("entity deltas", snapshot.entities.len())?.to_le_bytes());
    for delta in &snapshot.entities {
        match delta {
            EntityDelta::Updated(record) => {
                buf.push(0);
                put_entity(&mut buf, record);
            }
            EntityDelta::Removed(id) => {
                buf.push(1);
                buf.extend_from_slice(&id.0.to_le_bytes());
            }
        }
    }

    buf.extend_from_slice(&count_u32("flag records", snapshot.flags.len())?.to_le_bytes());
    for record in &snapshot.flags {
        put_flag(&mut buf, record);
    }

    let teams = u8::try_from(snapshot.teams.len()).map_err(|_| EncodingError::TooLong {
        what: "team deltas",
        len: snapshot.teams.len(),
    })?;
    buf.push(teams);
    for team in &snapshot.teams {
        buf.push(team.team.id());
        buf.extend_from_slice(&team.captures.to_le_bytes());
        buf.extend_from_slice(&team.upgrade_points.to_le_bytes());
        buf.push(team.upgrade_mask);
    }

    buf.extend_from_slice(&count_u32("events", snapshot.events.len())?.to_le_bytes());
    for event in &snapshot.events {
        let (kind, actor, target) = event.to_wire();
        buf.push(kind);
        buf.extend_from_slice(&actor.to_le_bytes());
        buf.extend_from_slice(&target.to_le_bytes());
    }
    Ok(buf)
}

/// Encode the result trailer.
#[must_use]
pub fn encode_trailer(result: &MatchResult) -> Vec<u8> {
    let mut buf = Vec::with_capacity(7);
    buf.push(TRAILER_TAG);
    buf.push(result.winner.id());
    buf.push(result.reason.code());
    buf.extend_from_slice(&result.rounds.to_le_bytes());
    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Empty,
    Rounds,
    Finished,
}

/// Append-only replay sink.
///
/// Blocks must arrive in order: header, rounds, trailer. Bytes already
/// written are never revisited.
#[derive(Debug)]
pub struct ReplayWriter<W: Write> {
    inner: W,
    stage: Stage,
    bytes_written: u64,
}

impl<W: Write> ReplayWriter<W> {
    /// Wrap a sink.
    #[must_use]
    pub const fn new(inner: W) -> Self {
        Self {
            inner,
            stage: Stage::Empty,
            bytes_written: 0,
        }
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), EncodingError> {
        self.inner.write_all(bytes).map_err(|err| {
            error!(%err, "replay write failed");
            EncodingError::Io(err)
        })?;
        self.bytes_written += u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        Ok(())
    }

    /// Write the header. Must be the first call.
    ///
    /// # Errors
    ///
    /// Fails if the header was already written or the sink fails.
    pub fn write_header(&mut self, header: &ReplayHeader) -> Result<(), EncodingError> {
        if self.stage != Stage::Empty {
            return Err(EncodingError::OutOfOrder("header written twice"));
        }
        let bytes = encode_header(header)?;
        self.append(&bytes)?;
        self.stage = Stage::Rounds;
        Ok(())
    }

    /// Append one round.
    ///
    /// # Errors
    ///
    /// Fails if called before the header or after the trailer, or if the sink fails.
    pub fn write_round(&mut self, snapshot: &RoundSnapshot) -> Result<(), EncodingError> {
        if self.stage != Stage::Rounds {
            return Err(EncodingError::OutOfOrder("round outside header/trailer"));
        }
        let bytes = encode_round(snapshot)?;
        self.append(&bytes)
    }

    /// Append the trailer and flush.
    ///
    /// # Errors
    ///
    /// Fails if called before the header or twice, or if the sink fails.
    pub fn finish(&mut self, result: &MatchResult) -> Result<(), EncodingError> {
        if self.stage != Stage::Rounds {
            return Err(EncodingError::OutOfOrder("trailer outside rounds"));
        }
        self.append(&encode_trailer(result))?;
        self.inner.flush()?;
        self.stage = Stage::Finished;
        Ok(())
    }

    /// Total bytes appended so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Unwrap the sink.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        Coord, EntityId, FlagId, FlagState, RoundEvent, Team, TeamDelta, UpgradeTable, WinReason,
    };

    fn header() -> ReplayHeader {
        ReplayHeader {
            map_name: "tiny".to_string(),
            width: 2,
            height: 1,
            min_corner: (0, 0),
            max_corner: (2, 1),
            seed: 9,
            passability: vec![1.0, 0.5],
            terrain: vec![2, 0],
            upgrades: UpgradeTable::default(),
            max_rounds: 10,
            entities: vec![],
            flags: vec![],
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_header(&header()).unwrap();
        assert_eq!(&bytes[0..4], b"FFRP");
        assert_eq!(&bytes[4..6], &1u16.to_le_bytes());
        assert_eq!(&bytes[6..8], &4u16.to_le_bytes());
        assert_eq!(&bytes[8..12], b"tiny");
        // magic, version, name, size, corners, seed, 2 cells, upgrades, rounds, 2 counts
        assert_eq!(bytes.len(), 4 + 2 + 2 + 4 + 4 + 16 + 8 + 2 * 9 + 36 + 4 + 8);
    }

    #[test]
    fn test_round_layout() {
        let snapshot = RoundSnapshot {
            round: 3,
            entities: vec![EntityDelta::Removed(EntityId(7))],
            flags: vec![FlagRecord {
                id: FlagId(1),
                team: Team::B,
                home: Coord::new(0, 0),
                position: Coord::new(1, 0),
                state: FlagState::Dropped,
                drop_rounds: 4,
                carrier: None,
            }],
            teams: vec![TeamDelta {
                team: Team::A,
                captures: 1,
                upgrade_points: 0,
                upgrade_mask: 0b100,
            }],
            events: vec![RoundEvent::Death { entity: EntityId(7) }],
        };
        let bytes = encode_round(&snapshot).unwrap();
        assert_eq!(bytes[0], ROUND_TAG);
        assert_eq!(&bytes[1..5], &3u32.to_le_bytes());
        assert_eq!(&bytes[5..9], &1u32.to_le_bytes());
        assert_eq!(bytes[9], 1);
        assert_eq!(&bytes[10..14], &7u32.to_le_bytes());
        let expected = 1 + 4 + (4 + 5) + (4 + 23) + (1 + 10) + (4 + 9);
        assert_eq!(bytes.len(), expected);
    }

    #[test]
    fn test_writer_enforces_order() {
        let mut writer = ReplayWriter::new(Vec::new());
        let result = MatchResult {
            winner: Team::A,
            reason: WinReason::Elimination,
            rounds: 1,
            captures: [0, 0],
        };
        assert!(matches!(
            writer.write_round(&RoundSnapshot::default()),
            Err(EncodingError::OutOfOrder(_))
        ));
        writer.write_header(&header()).unwrap();
        assert!(writer.write_header(&header()).is_err());
        writer.write_round(&RoundSnapshot::default()).unwrap();
        writer.finish(&result).unwrap();
        assert!(writer.write_round(&RoundSnapshot::default()).is_err());
        let written = writer.bytes_written();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len() as u64, written);
        assert_eq!(&bytes[bytes.len() - 7..], &encode_trailer(&result)[..]);
    }

    #[test]
    fn test_io_failure_is_reported() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut writer = ReplayWriter::new(Broken);
        assert!(matches!(
            writer.write_header(&header()),
            Err(EncodingError::Io(_))
        ));
    }
}
