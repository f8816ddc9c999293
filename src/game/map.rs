//! Grid model: coordinates, terrain and per-cell passability.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GridError};
use crate::game::Team;

/// Passability a wall may have at most. Walls always block movement.
pub const WALL_PASSABILITY: f64 = 0.1;

/// A cell coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// X coordinate (column).
    pub x: u16,
    /// Y coordinate (row).
    pub y: u16,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance to another cell.
    #[must_use]
    pub fn dist_sq(self, other: Coord) -> u32 {
        let dx = u32::from(self.x.abs_diff(other.x));
        let dy = u32::from(self.y.abs_diff(other.y));
        dx * dx + dy * dy
    }

    /// Chebyshev (king-move) distance to another cell.
    #[must_use]
    pub fn chebyshev(self, other: Coord) -> u16 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Step one cell in a direction, if that stays within `width x height`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn step(self, dir: Direction, width: u16, height: u16) -> Option<Coord> {
        let (dx, dy) = dir.delta();
        let x = i32::from(self.x) + dx;
        let y = i32::from(self.y) + dy;
        if x < 0 || y < 0 || x >= i32::from(width) || y >= i32::from(height) {
            return None;
        }
        // Both values are in [0, u16::MAX) after the bounds check.
        Some(Coord::new(x as u16, y as u16))
    }

    /// Neighbouring cells in the 8-neighbourhood, in [`Direction::ALL`] order.
    ///
    /// Returns a fixed-size array and count to avoid heap allocation.
    /// The array contains valid coordinates in indices `0..count`.
    #[must_use]
    #[inline]
    pub fn neighbors(self, width: u16, height: u16) -> ([Coord; 8], u8) {
        let mut result = [self; 8];
        let mut count = 0u8;
        for dir in Direction::ALL {
            if let Some(next) = self.step(dir, width, height) {
                result[usize::from(count)] = next;
                count += 1;
            }
        }
        (result, count)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the eight compass directions. Y grows downwards (north is `y - 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Up.
    North,
    /// Up and right.
    NorthEast,
    /// Right.
    East,
    /// Down and right.
    SouthEast,
    /// Down.
    South,
    /// Down and left.
    SouthWest,
    /// Left.
    West,
    /// Up and left.
    NorthWest,
}

impl Direction {
    /// Every direction, in the fixed order used for neighbour iteration.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Offset applied to a coordinate.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }
}

/// Static terrain of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Terrain {
    /// Open ground.
    Empty = 0,
    /// Impassable wall.
    Wall = 1,
    /// Team A spawn zone, also where team A scores captures.
    SpawnA = 2,
    /// Team B spawn zone, also where team B scores captures.
    SpawnB = 3,
}

impl Terrain {
    /// Check if entities may stand on this terrain.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Terrain::Wall)
    }

    /// The team whose spawn zone this is, if any.
    #[must_use]
    pub const fn spawn_team(self) -> Option<Team> {
        match self {
            Terrain::SpawnA => Some(Team::A),
            Terrain::SpawnB => Some(Team::B),
            Terrain::Empty | Terrain::Wall => None,
        }
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
            0 => Some(Terrain::Empty),
            1 => Some(Terrain::Wall),
            2 => Some(Terrain::SpawnA),
            3 => Some(Terrain::SpawnB),
            _ => None,
        }
    }
}

/// Raw, unvalidated description of a grid (as handed over by a map loader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Map name.
    pub name: String,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
    /// World coordinate of the min corner.
    pub origin: (i32, i32),
    /// Random seed the map was generated with.
    pub seed: u64,
    /// Passability per cell, row-major.
    pub passability: Vec<f64>,
    /// Terrain per cell, row-major.
    pub terrain: Vec<Terrain>,
}

impl GridSpec {
    /// A fully open grid: passability 1.0, no walls, no spawn zones.
    #[must_use]
    pub fn open(name: impl Into<String>, width: u16, height: u16) -> Self {
        let cells = usize::from(width) * usize::from(height);
        Self {
            name: name.into(),
            width,
            height,
            origin: (0, 0),
            seed: 0,
            passability: vec![1.0; cells],
            terrain: vec![Terrain::Empty; cells],
        }
    }

    /// Set the terrain of one cell, ignoring out-of-range coordinates.
    pub fn set_terrain(&mut self, coord: Coord, terrain: Terrain) {
        if coord.x < self.width && coord.y < self.height {
            let idx = usize::from(coord.y) * usize::from(self.width) + usize::from(coord.x);
            if let Some(cell) = self.terrain.get_mut(idx) {
                *cell = terrain;
            }
            if terrain == Terrain::Wall
                && let Some(p) = self.passability.get_mut(idx)
            {
                *p = p.min(WALL_PASSABILITY);
            }
        }
    }

    /// Set the passability of one cell, ignoring out-of-range coordinates.
    pub fn set_passability(&mut self, coord: Coord, value: f64) {
        if coord.x < self.width && coord.y < self.height {
            let idx = usize::from(coord.y) * usize::from(self.width) + usize::from(coord.x);
            if let Some(p) = self.passability.get_mut(idx) {
                *p = value;
            }
        }
    }
}

/// The validated, immutable grid a match is played on.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    name: String,
    width: u16,
    height: u16,
    origin: (i32, i32),
    seed: u64,
    /// Row-major.
    passability: Vec<f64>,
    /// Row-major.
    terrain: Vec<Terrain>,
}

impl Grid {
    /// Validate a grid description.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a dimension is zero, a layer has the wrong
    /// size, a passability is outside (0, 1], or a wall is too passable.
    pub fn new(spec: GridSpec) -> Result<Self, ConfigError> {
        let GridSpec {
            name,
            width,
            height,
            origin,
            seed,
            passability,
            terrain,
        } = spec;

        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGrid { width, height });
        }
        let cells = usize::from(width) * usize::from(height);
        if passability.len() != cells {
            return Err(ConfigError::LayerSize {
                layer: "passability",
                expected: cells,
                actual: passability.len(),
            });
        }
        if terrain.len() != cells {
            return Err(ConfigError::LayerSize {
                layer: "terrain",
                expected: cells,
                actual: terrain.len(),
            });
        }

        for (idx, (&value, &kind)) in passability.iter().zip(&terrain).enumerate() {
            let coord = index_to_coord(idx, width);
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(ConfigError::Passability { coord, value });
            }
            if kind == Terrain::Wall && value > WALL_PASSABILITY {
                return Err(ConfigError::PassableWall { coord, value });
            }
        }

        Ok(Self {
            name,
            width,
            height,
            origin,
            seed,
            passability,
            terrain,
        })
    }

    /// Map name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.passability.len()
    }

    /// Seed the map was generated with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// World coordinate of the min corner.
    #[must_use]
    pub const fn min_corner(&self) -> (i32, i32) {
        self.origin
    }

    /// World coordinate of the max corner.
    #[must_use]
    pub fn max_corner(&self) -> (i32, i32) {
        (
            self.origin.0.saturating_add(i32::from(self.width)),
            self.origin.1.saturating_add(i32::from(self.height)),
        )
    }

    /// Row-major passability layer.
    #[must_use]
    pub fn passability(&self) -> &[f64] {
        &self.passability
    }

    /// Row-major terrain layer.
    #[must_use]
    pub fn terrain(&self) -> &[Terrain] {
        &self.terrain
    }

    /// Check if a coordinate is within the grid bounds.
    #[must_use]
    pub const fn in_bounds(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    fn index(&self, coord: Coord) -> Result<usize, GridError> {
        if self.in_bounds(coord) {
            Ok(usize::from(coord.y) * usize::from(self.width) + usize::from(coord.x))
        } else {
            Err(GridError::OutOfBounds {
                coord,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Passability factor of a cell.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] for cells outside the grid.
    pub fn passability_at(&self, coord: Coord) -> Result<f64, GridError> {
        self.index(coord).map(|idx| self.passability[idx])
    }

    /// Terrain of a cell.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] for cells outside the grid.
    pub fn terrain_at(&self, coord: Coord) -> Result<Terrain, GridError> {
        self.index(coord).map(|idx| self.terrain[idx])
    }

    /// True for walls. Cells outside the grid count as blocked too.
    #[must_use]
    pub fn is_blocked(&self, coord: Coord) -> bool {
        !self.terrain_at(coord).is_ok_and(Terrain::is_passable)
    }

    /// Cooldown recovery earned on a cell: `floor(reduction * passability)`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] for cells outside the grid.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn recovery_at(&self, coord: Coord, reduction: u32) -> Result<u32, GridError> {
        let factor = self.passability_at(coord)?;
        // factor is in (0, 1], so the product never exceeds `reduction`.
        Ok((f64::from(reduction) * factor).floor() as u32)
    }

    /// Iterate over all coordinates and terrain, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, Terrain)> + '_ {
        let width = self.width;
        self.terrain
            .iter()
            .enumerate()
            .map(move |(idx, &terrain)| (index_to_coord(idx, width), terrain))
    }

    /// Cells of a team's spawn (and capture) zone, row-major.
    pub fn spawn_zone(&self, team: Team) -> impl Iterator<Item = Coord> + '_ {
        self.cells()
            .filter(move |(_, terrain)| terrain.spawn_team() == Some(team))
            .map(|(coord, _)| coord)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn index_to_coord(idx: usize, width: u16) -> Coord {
    let x = (idx % usize::from(width)) as u16;
    let y = (idx / usize::from(width)) as u16;
    Coord::new(x, y)
}
