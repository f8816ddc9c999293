//! Replay log: an append-only binary record of a match.
//!
//! Format v1, all integers little-endian:
//! - Header: magic `FFRP`, version `u16`, map (name, size, corners, seed,
//!   passability, terrain), upgrade table, `max_rounds`, initial entities
//!   and flags.
//! - One block per round, tagged `0x52`, holding the round's deltas.
//! - A trailer, tagged `0x45`, holding the match result.
//!
//! The log carries full round deltas, so a viewer can rebuild any round by
//! applying blocks in order without re-running agents.

mod decode;
mod encode;

pub use decode::{Replay, ReplayReader};
pub use encode::{ReplayWriter, encode_header, encode_round, encode_trailer};

use crate::game::{EntityRecord, FlagRecord, Grid, MatchState, RuleConfig, UpgradeTable};

/// Leading bytes of every replay.
pub const MAGIC: [u8; 4] = *b"FFRP";

/// Format version written by this build.
pub const VERSION: u16 = 1;

/// Tag of a round block.
pub const ROUND_TAG: u8 = 0x52;

/// Tag of the result trailer.
pub const TRAILER_TAG: u8 = 0x45;

/// Everything known before round 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayHeader {
    /// Map name.
    pub map_name: String,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
    /// World coordinate of the min corner.
    pub min_corner: (i32, i32),
    /// World coordinate of the max corner.
    pub max_corner: (i32, i32),
    /// Map seed.
    pub seed: u64,
    /// Passability per cell, row-major.
    pub passability: Vec<f64>,
    /// Terrain codes per cell, row-major.
    pub terrain: Vec<u8>,
    /// Upgrade effects in force.
    pub upgrades: UpgradeTable,
    /// Round limit.
    pub max_rounds: u32,
    /// Entities at round 0.
    pub entities: Vec<EntityRecord>,
    /// Flags at round 0.
    pub flags: Vec<FlagRecord>,
}

impl ReplayHeader {
    /// Describe a match about to start.
    #[must_use]
    pub fn new(state: &MatchState, rules: &RuleConfig) -> Self {
        let grid: &Grid = &state.grid;
        Self {
            map_name: grid.name().to_string(),
            width: grid.width(),
            height: grid.height(),
            min_corner: grid.min_corner(),
            max_corner: grid.max_corner(),
            seed: grid.seed(),
            passability: grid.passability().to_vec(),
            terrain: grid.terrain().iter().map(|t| t.code()).collect(),
            upgrades: *state.upgrades.table(),
            max_rounds: rules.max_rounds,
            entities: state.entities.iter().map(EntityRecord::from).collect(),
            flags: state.flags.iter().map(FlagRecord::from).collect(),
        }
    }
}
