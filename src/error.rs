//! Error types for match setup, resolution and replay persistence.
//!
//! Illegal agent actions are not errors at this level: they are reported as
//! [`Rejection`](crate::game::Rejection)s and turned into no-ops inside the
//! resolver. Everything here is fatal to the match it occurs in.

use std::io;

use thiserror::Error;

use crate::controller::MapGenError;
use crate::game::{Coord, EntityId, FlagId};

/// A grid lookup outside the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    /// The coordinate lies outside `[0, width) x [0, height)`.
    #[error("cell {coord} is outside the {width}x{height} grid")]
    OutOfBounds {
        /// The offending coordinate.
        coord: Coord,
        /// Grid width.
        width: u16,
        /// Grid height.
        height: u16,
    },
}

/// Malformed map, setup or rule set. Raised before any round runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    EmptyGrid {
        /// Requested width.
        width: u16,
        /// Requested height.
        height: u16,
    },
    /// A per-cell layer does not have `width * height` entries.
    #[error("{layer} layer has {actual} cells, expected {expected}")]
    LayerSize {
        /// Which layer (`passability` or `terrain`).
        layer: &'static str,
        /// Expected cell count.
        expected: usize,
        /// Actual cell count.
        actual: usize,
    },
    /// Passability outside (0, 1].
    #[error("passability {value} at {coord} is outside (0, 1]")]
    Passability {
        /// Cell with the bad value.
        coord: Coord,
        /// The value found.
        value: f64,
    },
    /// A wall cell is more passable than the blocking limit allows.
    #[error("wall at {coord} has passability {value}, above the blocking limit")]
    PassableWall {
        /// Wall cell.
        coord: Coord,
        /// The value found.
        value: f64,
    },
    /// An entity or flag is placed outside the grid or on a wall.
    #[error("{what} placed on invalid cell {coord}")]
    Placement {
        /// Description of the placed object.
        what: String,
        /// The cell.
        coord: Coord,
    },
    /// Two entities share a starting cell.
    #[error("entities {first} and {second} both start on {coord}")]
    SharedCell {
        /// Lower entity id.
        first: EntityId,
        /// Higher entity id.
        second: EntityId,
        /// The shared cell.
        coord: Coord,
    },
    /// The same flag id was registered twice.
    #[error("duplicate flag id {0}")]
    DuplicateFlag(FlagId),
    /// A rule constant is out of its allowed range.
    #[error("invalid rule `{name}`: {reason}")]
    Rule {
        /// Rule field name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// A single broken state invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violation: {message}")]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl InvariantViolation {
    /// Create a violation from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Internal consistency broken after a resolution phase.
///
/// This indicates an engine bug, not an illegal action, so it aborts the
/// match. `diagnostic` carries the round's ordered inputs for reproduction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("round {round}: invariants broken after {phase}: {}", summary(.violations))]
pub struct StateInvariantViolation {
    /// Round being resolved.
    pub round: u32,
    /// Phase after which the check failed.
    pub phase: &'static str,
    /// Every violation found.
    pub violations: Vec<InvariantViolation>,
    /// Dump of the round's ordered action requests.
    pub diagnostic: String,
}

fn summary(violations: &[InvariantViolation]) -> String {
    let messages: Vec<&str> = violations.iter().map(|v| v.message.as_str()).collect();
    format!("{} found: {}", messages.len(), messages.join("; "))
}

/// Failure to persist the replay log.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The underlying writer failed.
    #[error("replay write failed: {0}")]
    Io(#[from] io::Error),
    /// A list is too long for its length prefix.
    #[error("{what} has {len} entries, more than the format allows")]
    TooLong {
        /// What was being encoded.
        what: &'static str,
        /// Its length.
        len: usize,
    },
    /// Header written twice, or a round written before the header.
    #[error("replay blocks written out of order: {0}")]
    OutOfOrder(&'static str),
}

/// Failure to parse a replay log.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The underlying reader failed.
    #[error("replay read failed: {0}")]
    Io(#[from] io::Error),
    /// The magic number did not match.
    #[error("not a flagfall replay (bad magic)")]
    BadMagic,
    /// The version is not understood by this reader.
    #[error("unsupported replay version {0}")]
    UnsupportedVersion(u16),
    /// The log ended inside a block.
    #[error("replay truncated at byte {offset}")]
    Truncated {
        /// Offset where more bytes were expected.
        offset: usize,
    },
    /// A field held a value outside its domain.
    #[error("invalid {field} value {value} at byte {offset}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: u64,
        /// Offset of the field.
        offset: usize,
    },
    /// The map name is not UTF-8.
    #[error("map name is not valid UTF-8")]
    BadName,
}

/// Structured failure of a whole match.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The setup or rules were rejected before round 1.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The engine detected corrupt state.
    #[error(transparent)]
    Invariant(#[from] StateInvariantViolation),
    /// The replay could not be written.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// A seeded setup could not be generated.
    #[error(transparent)]
    Generation(#[from] MapGenError),
    /// A stop was requested; honoured after the round committed.
    #[error("match cancelled after round {round}")]
    Cancelled {
        /// Last committed round.
        round: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_error_display() {
        let err = GridError::OutOfBounds {
            coord: Coord::new(5, 9),
            width: 4,
            height: 4,
        };
        let text = err.to_string();
        assert!(text.contains("(5, 9)"));
        assert!(text.contains("4x4"));
    }

    #[test]
    fn test_state_violation_lists_messages() {
        let err = StateInvariantViolation {
            round: 12,
            phase: "movement",
            violations: vec![
                InvariantViolation::new("two entities on (1, 1)"),
                InvariantViolation::new("flag 3 has no carrier"),
            ],
            diagnostic: String::new(),
        };
        let text = err.to_string();
        assert!(text.contains("round 12"));
        assert!(text.contains("movement"));
        assert!(text.contains("2 found"));
        assert!(text.contains("flag 3 has no carrier"));
    }

    #[test]
    fn test_match_error_wraps_config() {
        let err: MatchError = ConfigError::DuplicateFlag(FlagId(2)).into();
        assert!(matches!(err, MatchError::Config(_)));
        assert!(err.to_string().contains("duplicate flag id"));
    }
}
