//! Core types for the city simulation
//!
//! Grid cells and world pixels are separate types so the two coordinate
//! spaces can't be mixed up by accident.

use std::fmt;

/// Edge length of one tile in world pixels
pub const TILE_SIZE: f32 = 64.0;

/// Neighbour expansion order shared by every search: up, down, left, right
pub const DIRECTIONS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// An RGB colour carried as rendering metadata
pub type Rgb = (u8, u8, u8);

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for NPC vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NpcId(pub SimId);

/// A wrapper type for pedestrian IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PedestrianId(pub SimId);

/// A tile coordinate on the city grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridPos {
    pub row: i32,
    pub col: i32,
}

impl GridPos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn manhattan(&self, other: &GridPos) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    pub fn offset(&self, d_row: i32, d_col: i32) -> GridPos {
        GridPos::new(self.row + d_row, self.col + d_col)
    }

    /// The four orthogonal neighbours in `DIRECTIONS` order
    pub fn neighbors(&self) -> [GridPos; 4] {
        DIRECTIONS.map(|(dr, dc)| self.offset(dr, dc))
    }

    /// World-space centre of this tile
    pub fn center(&self) -> WorldPos {
        WorldPos::new(
            self.col as f32 * TILE_SIZE + TILE_SIZE / 2.0,
            self.row as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        )
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A position in world pixels, y growing downwards
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

impl WorldPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &WorldPos) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// The tile containing this point
    pub fn to_grid(&self) -> GridPos {
        GridPos::new(
            (self.y / TILE_SIZE).floor() as i32,
            (self.x / TILE_SIZE).floor() as i32,
        )
    }

    /// Compass bearing to another point in degrees (0 = up, clockwise)
    pub fn bearing_to(&self, other: &WorldPos) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx.atan2(-dy).to_degrees().rem_euclid(360.0)
    }

    /// Step toward `target` by at most `max_step`, never past it
    pub fn step_toward(&self, target: &WorldPos, max_step: f32) -> WorldPos {
        let dist = self.distance(target);
        if dist <= max_step || dist <= f32::EPSILON {
            return *target;
        }
        let ratio = max_step.max(0.0) / dist;
        WorldPos::new(
            self.x + (target.x - self.x) * ratio,
            self.y + (target.y - self.y) * ratio,
        )
    }

    /// Point reached by travelling `distance` along a compass bearing
    pub fn project(&self, bearing: f32, distance: f32) -> WorldPos {
        let rad = bearing.to_radians();
        WorldPos::new(self.x + rad.sin() * distance, self.y - rad.cos() * distance)
    }
}

/// Absolute angular difference folded into [0, 180]
pub fn angle_difference(a: f32, b: f32) -> f32 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Heading in degrees for a grid step, using the sign of each delta.
/// Returns `None` when the two cells coincide.
pub fn heading_for_step(from: GridPos, to: GridPos) -> Option<f32> {
    let dr = (to.row - from.row).signum();
    let dc = (to.col - from.col).signum();
    match (dr, dc) {
        (-1, 0) => Some(0.0),
        (-1, 1) => Some(45.0),
        (0, 1) => Some(90.0),
        (1, 1) => Some(135.0),
        (1, 0) => Some(180.0),
        (1, -1) => Some(225.0),
        (0, -1) => Some(270.0),
        (-1, -1) => Some(315.0),
        _ => None,
    }
}

/// Exponential approach of `current` toward `target` along the shortest arc
pub fn lerp_angle(current: f32, target: f32, rate: f32, delta_secs: f32) -> f32 {
    let mut diff = (target - current).rem_euclid(360.0);
    if diff > 180.0 {
        diff -= 360.0;
    }
    let factor = (rate * delta_secs).clamp(0.0, 1.0);
    (current + diff * factor).rem_euclid(360.0)
}
